use crate::foundation::core::Fps;
use crate::foundation::error::EyeCandyResult;
use crate::program::engine::ProgramEngine;
use crate::queue::plan::{expected_frame_count, format_duration};
use crate::stimulus::spec::StimulusSpec;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::io::Write;
use std::time::{Duration, Instant};

/// Bounds on one cooperative generation step.
///
/// A slice ends after `max_stimuli` pulls or `max_millis` of wall-clock time, whichever comes
/// first, so the caller regains control between slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSlice {
    /// Most stimuli pulled per slice.
    pub max_stimuli: usize,
    /// Wall-clock budget per slice.
    pub max_millis: u64,
}

impl Default for GenerationSlice {
    fn default() -> Self {
        Self {
            max_stimuli: 500,
            max_millis: 20,
        }
    }
}

/// Where generation stands after a slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationStatus {
    /// More stimuli may follow; call again.
    InProgress,
    /// The program signalled `done`.
    Exhausted,
    /// The duration cap was met or exceeded.
    Capped,
}

impl GenerationStatus {
    /// `true` unless more stimuli may follow.
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Counters for one generation slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceStats {
    /// Stimuli pulled from the engine.
    pub pulled: u64,
    /// New image paths seen.
    pub images_added: u64,
}

/// FIFO buffer between the program engine and the renderer side, with duration accounting.
pub struct StimulusQueue {
    queue: VecDeque<StimulusSpec>,
    total_duration_secs: f64,
    generated: u64,
    limit_secs: Option<f64>,
    images: BTreeSet<String>,
    status: GenerationStatus,
    stim_log: Option<Box<dyn Write + Send>>,
}

impl StimulusQueue {
    /// Create an empty queue. `limit_secs <= 0` means no duration cap.
    pub fn new(limit_secs: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            total_duration_secs: 0.0,
            generated: 0,
            limit_secs: (limit_secs > 0.0).then_some(limit_secs),
            images: BTreeSet::new(),
            status: GenerationStatus::InProgress,
            stim_log: None,
        }
    }

    /// Append every generated stimulus to `writer` as one JSON line.
    pub fn with_stim_log(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.stim_log = Some(writer);
        self
    }

    /// Pull from `engine` until the slice budget runs out, the program is done, or the cap is hit.
    #[tracing::instrument(skip_all, fields(generated = self.generated))]
    pub fn generate_slice(
        &mut self,
        engine: &mut ProgramEngine,
        slice: &GenerationSlice,
    ) -> EyeCandyResult<(GenerationStatus, SliceStats)> {
        let mut stats = SliceStats::default();
        if self.status.is_finished() {
            return Ok((self.status, stats));
        }

        let deadline = Instant::now() + Duration::from_millis(slice.max_millis);
        let max = slice.max_stimuli.max(1);
        for _ in 0..max {
            let step = engine.next_step()?;
            let Some(stimulus) = step.value else {
                self.finish(GenerationStatus::Exhausted)?;
                break;
            };
            stats.pulled += 1;
            if self.push(stimulus)? {
                stats.images_added += 1;
            }
            if self
                .limit_secs
                .is_some_and(|limit| self.total_duration_secs >= limit)
            {
                self.finish(GenerationStatus::Capped)?;
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok((self.status, stats))
    }

    /// Drive `generate_slice` until generation finishes.
    pub fn generate_all(
        &mut self,
        engine: &mut ProgramEngine,
        slice: &GenerationSlice,
    ) -> EyeCandyResult<GenerationStatus> {
        loop {
            let (status, _) = self.generate_slice(engine, slice)?;
            if status.is_finished() {
                return Ok(status);
            }
        }
    }

    /// Returns `true` when this stimulus introduced a new image path.
    fn push(&mut self, stimulus: StimulusSpec) -> EyeCandyResult<bool> {
        if let Some(log) = self.stim_log.as_mut() {
            serde_json::to_writer(&mut *log, &stimulus)?;
            log.write_all(b"\n").context("write stimulus log")?;
        }
        self.total_duration_secs += stimulus.lifespan();
        self.generated += 1;
        let new_image = match stimulus.image_path() {
            Some(path) => self.images.insert(path.to_owned()),
            None => false,
        };
        self.queue.push_back(stimulus);
        Ok(new_image)
    }

    fn finish(&mut self, status: GenerationStatus) -> EyeCandyResult<()> {
        self.status = status;
        if let Some(mut log) = self.stim_log.take() {
            log.flush().context("flush stimulus log")?;
        }
        tracing::info!(
            status = ?status,
            summary = %format_duration(self.generated, self.total_duration_secs),
            "stimulus generation finished"
        );
        Ok(())
    }

    /// Remove up to `max` stimuli from the front of the queue.
    pub fn take_batch(&mut self, max: usize) -> Vec<StimulusSpec> {
        let n = max.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    /// Generation status after the last slice.
    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    /// `true` once generation has finished and every stimulus has been taken.
    pub fn is_exhausted(&self) -> bool {
        self.status.is_finished() && self.queue.is_empty()
    }

    /// Stimuli waiting to be taken.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Summed lifespan of every generated stimulus.
    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }

    /// Stimuli generated so far, including ones already taken.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Image paths referenced by generated `IMAGE` stimuli.
    pub fn images(&self) -> &BTreeSet<String> {
        &self.images
    }

    /// `round(total_duration_secs * fps)`.
    pub fn expected_frame_count(&self, fps: Fps) -> u64 {
        expected_frame_count(self.total_duration_secs, fps)
    }

    /// `"<n> total, <h> hours, <m> mins, <s.s> sec"`.
    pub fn summary(&self) -> String {
        format_duration(self.generated, self.total_duration_secs)
    }
}

impl std::fmt::Debug for StimulusQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StimulusQueue")
            .field("len", &self.queue.len())
            .field("generated", &self.generated)
            .field("total_duration_secs", &self.total_duration_secs)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
