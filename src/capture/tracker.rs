use crate::encode::encoder::{FrameId, VideoEncoder};
use crate::foundation::error::EyeCandyResult;
use crate::render::frame::FrameBuffer;
use std::collections::HashMap;
use std::sync::Arc;

/// Frame bookkeeping for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounters {
    /// Frames handed to the coordinator, pre-roll included.
    pub produced: u64,
    /// Index of the first real stimulus frame; set once.
    pub first_frame: Option<u64>,
    /// `produced - in_flight`.
    pub processed: u64,
}

/// Progress in live frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Live frames the encoder has finished.
    pub frames_done: u64,
    /// Live frames the run will encode.
    pub frames_total: u64,
}

/// Result of one completion poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Buffers released by this poll.
    pub released: usize,
    /// Progress after this poll.
    pub progress: Progress,
    /// `true` on the single poll that observed completion.
    pub completed: bool,
}

/// Retains every submitted frame until the encoder reports its id, and detects end of run.
#[derive(Debug)]
pub struct CompletionTracker {
    pending: HashMap<FrameId, Arc<FrameBuffer>>,
    counters: FrameCounters,
    expected: u64,
    completion_reported: bool,
}

impl CompletionTracker {
    /// Tracker for a run of `expected_frame_count` live frames.
    pub fn new(expected_frame_count: u64) -> Self {
        Self {
            pending: HashMap::new(),
            counters: FrameCounters::default(),
            expected: expected_frame_count,
            completion_reported: false,
        }
    }

    /// Current counters.
    pub fn counters(&self) -> FrameCounters {
        self.counters
    }

    /// Live frames the run will encode.
    pub fn expected_frame_count(&self) -> u64 {
        self.expected
    }

    /// Frames submitted and not yet completed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Count one frame accepted by the coordinator.
    pub(crate) fn advance_produced(&mut self) {
        self.counters.produced += 1;
        self.refresh_processed();
    }

    pub(crate) fn set_first_frame(&mut self, index: u64) {
        if self.counters.first_frame.is_none() {
            self.counters.first_frame = Some(index);
        }
    }

    /// `produced >= expected + first`. Never true before the first frame is known.
    pub fn deadline_reached(&self) -> bool {
        self.counters
            .first_frame
            .is_some_and(|first| self.counters.produced >= self.expected + first)
    }

    /// Hand `frame` to the encoder and retain it until completion.
    pub fn submit(
        &mut self,
        encoder: &mut dyn VideoEncoder,
        frame: Arc<FrameBuffer>,
    ) -> EyeCandyResult<FrameId> {
        let id = encoder.submit(Arc::clone(&frame))?;
        if self.pending.insert(id, frame).is_some() {
            tracing::warn!(id = id.0, "encoder reused a pending frame id");
        }
        self.refresh_processed();
        Ok(id)
    }

    /// Collect completed ids, release their buffers, and check for end of run.
    pub fn poll(&mut self, encoder: &mut dyn VideoEncoder) -> EyeCandyResult<PollReport> {
        let mut released = 0;
        for id in encoder.check_completed()? {
            if self.pending.remove(&id).is_some() {
                released += 1;
            } else {
                tracing::warn!(id = id.0, "completion for unknown frame id");
            }
        }
        self.refresh_processed();

        let completed = !self.completion_reported && self.is_complete();
        if completed {
            self.completion_reported = true;
        }
        Ok(PollReport {
            released,
            progress: self.progress(),
            completed,
        })
    }

    /// Nothing in flight and every needed frame produced.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.deadline_reached()
    }

    /// `true` once completion has been reported.
    pub fn completion_reported(&self) -> bool {
        self.completion_reported
    }

    /// Progress as of the last update.
    pub fn progress(&self) -> Progress {
        let done = match self.counters.first_frame {
            Some(first) => self.counters.processed.saturating_sub(first),
            None => 0,
        };
        Progress {
            frames_done: done.min(self.expected),
            frames_total: self.expected,
        }
    }

    /// Drop every retained buffer and reset the counters.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.counters = FrameCounters::default();
        self.completion_reported = false;
    }

    fn refresh_processed(&mut self) {
        self.counters.processed = self
            .counters
            .produced
            .saturating_sub(self.pending.len() as u64);
    }
}
