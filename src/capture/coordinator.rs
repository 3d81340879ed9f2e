use crate::capture::tracker::{CompletionTracker, FrameCounters, PollReport};
use crate::encode::encoder::{FrameId, VideoEncoder};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::frame::FrameBuffer;
use std::collections::VecDeque;
use std::sync::Arc;

/// Capture phase of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapturePhase {
    /// Buffering frames until the first live frame is signalled.
    AwaitingFirstFrame,
    /// Submitting each frame as it arrives.
    Streaming,
    /// Deadline reached; waiting for the encoder to finish.
    Draining,
    /// Every frame completed, or the run was torn down.
    Stopped,
}

/// What happened to one produced frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Held until the first live frame is known.
    Buffered,
    /// Sent to the encoder as output frame `local`.
    Submitted {
        /// Encoder id of the frame.
        id: FrameId,
        /// Position of the frame in the output video.
        local: FrameIndex,
    },
    /// Before the first live frame.
    DiscardedPreRoll,
    /// After the frame deadline.
    DiscardedPastDeadline,
    /// The run already stopped.
    Ignored,
}

/// Classifies each produced frame as pre-roll or live and feeds live frames to the encoder in
/// production order.
#[derive(Debug)]
pub struct FrameCoordinator {
    phase: CapturePhase,
    canvas: Canvas,
    buffered: VecDeque<(u64, Arc<FrameBuffer>)>,
    tracker: CompletionTracker,
}

impl FrameCoordinator {
    /// Coordinator for a capture of `expected_frame_count` live frames.
    pub fn new(canvas: Canvas, expected_frame_count: u64) -> Self {
        Self {
            phase: CapturePhase::AwaitingFirstFrame,
            canvas,
            buffered: VecDeque::new(),
            tracker: CompletionTracker::new(expected_frame_count),
        }
    }

    /// Current capture phase.
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Frame counters.
    pub fn counters(&self) -> FrameCounters {
        self.tracker.counters()
    }

    /// The completion tracker holding in-flight frames.
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Frames held while awaiting the first live frame.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Accept the frame produced on this tick.
    pub fn on_frame(
        &mut self,
        encoder: &mut dyn VideoEncoder,
        frame: FrameBuffer,
    ) -> EyeCandyResult<FrameDisposition> {
        if !frame.matches(self.canvas) {
            return Err(EyeCandyError::encoder_io(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.canvas.width, self.canvas.height
            )));
        }

        match self.phase {
            CapturePhase::Stopped => Ok(FrameDisposition::Ignored),
            CapturePhase::AwaitingFirstFrame => {
                let index = self.tracker.counters().produced;
                self.buffered.push_back((index, Arc::new(frame)));
                self.tracker.advance_produced();
                Ok(FrameDisposition::Buffered)
            }
            CapturePhase::Streaming | CapturePhase::Draining => {
                if self.tracker.deadline_reached() {
                    self.enter_draining();
                    return Ok(FrameDisposition::DiscardedPastDeadline);
                }
                let index = self.tracker.counters().produced;
                self.tracker.advance_produced();
                let first = self.tracker.counters().first_frame.unwrap_or(0);
                if index < first {
                    return Ok(FrameDisposition::DiscardedPreRoll);
                }
                let id = self.tracker.submit(encoder, Arc::new(frame))?;
                if self.tracker.deadline_reached() {
                    self.enter_draining();
                }
                Ok(FrameDisposition::Submitted {
                    id,
                    local: FrameIndex(index - first),
                })
            }
        }
    }

    /// Record the index of the first real stimulus frame and flush buffered frames from it on.
    ///
    /// Only the first call has an effect. Returns the number of frames submitted by the flush.
    pub fn signal_first_live_frame(
        &mut self,
        encoder: &mut dyn VideoEncoder,
        first: u64,
    ) -> EyeCandyResult<usize> {
        if self.phase != CapturePhase::AwaitingFirstFrame {
            tracing::warn!(first, "first live frame already signalled; ignoring");
            return Ok(0);
        }
        self.tracker.set_first_frame(first);
        self.phase = CapturePhase::Streaming;

        let deadline = first + self.tracker.expected_frame_count();
        let mut flushed = 0;
        let mut preroll = 0;
        while let Some((index, frame)) = self.buffered.pop_front() {
            if index < first {
                preroll += 1;
            } else if index < deadline {
                self.tracker.submit(encoder, frame)?;
                flushed += 1;
            }
        }
        tracing::debug!(first, flushed, preroll, "first live frame signalled");
        if self.tracker.deadline_reached() {
            self.enter_draining();
        }
        Ok(flushed)
    }

    /// Poll the encoder for completions; stops the coordinator once the run is complete.
    pub fn poll(&mut self, encoder: &mut dyn VideoEncoder) -> EyeCandyResult<PollReport> {
        let report = self.tracker.poll(encoder)?;
        if report.completed {
            self.phase = CapturePhase::Stopped;
        }
        Ok(report)
    }

    /// Drop buffered and pending frames and stop.
    pub fn clear(&mut self) {
        self.buffered.clear();
        self.tracker.clear();
        self.phase = CapturePhase::Stopped;
    }

    fn enter_draining(&mut self) {
        if self.phase == CapturePhase::Streaming {
            tracing::debug!(
                produced = self.tracker.counters().produced,
                "frame deadline reached"
            );
            self.phase = CapturePhase::Draining;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/coordinator.rs"]
mod tests;
