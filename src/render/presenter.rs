use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::EyeCandyResult;
use crate::render::draw::{DrawContext, DrawTable};
use crate::render::frame::FrameBuffer;
use crate::render::images::ImageCache;
use crate::stimulus::spec::StimulusSpec;
use std::collections::VecDeque;

/// Supplier of stimulus batches for a [`Presenter`].
///
/// An empty batch means no more stimuli will ever arrive.
pub trait StimulusSource {
    /// Up to one batch of stimuli, in program order.
    fn next_batch(&mut self) -> EyeCandyResult<Vec<StimulusSpec>>;
}

impl StimulusSource for VecDeque<StimulusSpec> {
    fn next_batch(&mut self) -> EyeCandyResult<Vec<StimulusSpec>> {
        Ok(self.drain(..).collect())
    }
}

/// Where a [`Presenter`] is in its stimulus stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterState {
    /// No stimulus frame drawn yet.
    Starting,
    /// Showing stimuli.
    Running,
    /// Every stimulus has been shown.
    Complete,
}

#[derive(Debug)]
struct Showing {
    spec: StimulusSpec,
    index: u64,
    frame: u64,
    frames: u64,
}

/// Turns a stream of stimuli into frames, one per display tick.
///
/// Each stimulus is shown for `frame_count(fps)` frames; its age advances by one frame duration
/// after every draw. The local queue is refilled from the source when it falls to
/// `reload_threshold` entries.
#[derive(Debug)]
pub struct Presenter {
    table: DrawTable,
    images: ImageCache,
    canvas: Canvas,
    fps: Fps,
    seed: u32,
    reload_threshold: usize,
    local: VecDeque<StimulusSpec>,
    showing: Option<Showing>,
    source_exhausted: bool,
    state: PresenterState,
    next_index: u64,
    frames_drawn: u64,
}

impl Presenter {
    /// Presenter drawing `canvas`-sized frames at `fps` with the standard draw table.
    pub fn new(canvas: Canvas, fps: Fps, seed: u32, reload_threshold: usize) -> Self {
        Self {
            table: DrawTable::standard(),
            images: ImageCache::default(),
            canvas,
            fps,
            seed,
            reload_threshold,
            local: VecDeque::new(),
            showing: None,
            source_exhausted: false,
            state: PresenterState::Starting,
            next_index: 0,
            frames_drawn: 0,
        }
    }

    /// Use `images` for `IMAGE` stimuli.
    pub fn with_images(mut self, images: ImageCache) -> Self {
        self.images = images;
        self
    }

    /// Replace the draw table.
    pub fn with_draw_table(mut self, table: DrawTable) -> Self {
        self.table = table;
        self
    }

    /// Current presenter state.
    pub fn state(&self) -> PresenterState {
        self.state
    }

    /// `true` once every stimulus has been shown.
    pub fn is_complete(&self) -> bool {
        self.state == PresenterState::Complete
    }

    /// Stimulus frames drawn so far.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Stimuli waiting in the local queue.
    pub fn queued(&self) -> usize {
        self.local.len()
    }

    fn refill(&mut self, source: &mut dyn StimulusSource) -> EyeCandyResult<()> {
        if self.source_exhausted || self.local.len() > self.reload_threshold {
            return Ok(());
        }
        let batch = source.next_batch()?;
        if batch.is_empty() {
            self.source_exhausted = true;
        } else {
            tracing::trace!(received = batch.len(), queued = self.local.len(), "stimulus batch");
            self.local.extend(batch);
        }
        Ok(())
    }

    /// Draw the next frame, or `None` once every stimulus has been shown.
    pub fn next_frame(
        &mut self,
        source: &mut dyn StimulusSource,
    ) -> EyeCandyResult<Option<FrameBuffer>> {
        if self.is_complete() {
            return Ok(None);
        }
        self.refill(source)?;

        while self.showing.is_none() {
            let Some(spec) = self.local.pop_front() else {
                if self.source_exhausted {
                    self.state = PresenterState::Complete;
                    tracing::debug!(frames = self.frames_drawn, "presenter finished");
                    return Ok(None);
                }
                self.refill(source)?;
                continue;
            };
            let index = self.next_index;
            self.next_index += 1;
            let frames = spec.frame_count(self.fps);
            if frames == 0 {
                tracing::debug!(index, kind = spec.tag().label(), "skipping zero-frame stimulus");
                continue;
            }
            self.showing = Some(Showing {
                spec,
                index,
                frame: 0,
                frames,
            });
        }

        let Some(showing) = self.showing.as_mut() else {
            return Ok(None);
        };
        let ctx = DrawContext {
            canvas: self.canvas,
            fps: self.fps,
            seed: self.seed,
            stimulus_index: showing.index,
            frame: showing.frame,
            images: &self.images,
        };
        let frame = self.table.render(&showing.spec, &ctx)?;
        showing.spec.advance_age(self.fps.frame_duration_secs());
        showing.frame += 1;
        if showing.frame >= showing.frames {
            self.showing = None;
        }
        self.frames_drawn += 1;
        self.state = PresenterState::Running;
        Ok(Some(frame))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/presenter.rs"]
mod tests;
