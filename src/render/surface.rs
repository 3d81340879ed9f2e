use crate::foundation::color::Color;
use crate::foundation::core::Canvas;
use crate::foundation::error::EyeCandyResult;
use crate::render::frame::FrameBuffer;
use crate::render::presenter::{Presenter, StimulusSource};

/// Extra frames a display-backed surface emits after the first stimulus draw before the
/// stimulus is actually on screen. Frames up to that point are discarded by capture.
pub const DEFAULT_PREROLL_PADDING_FRAMES: u64 = 2;

/// Role of a frame emitted by [`HeadlessSurface::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickKind {
    /// Blank frame emitted before presentation starts.
    PreRoll,
    /// Stimulus frame.
    Live,
    /// Blank frame after the presenter finished.
    Idle,
}

/// One frame emitted by a surface tick.
#[derive(Clone, Debug)]
pub struct SurfaceTick {
    /// Producer-side index of this frame.
    pub index: u64,
    /// Pixels of this tick.
    pub frame: FrameBuffer,
    /// Set on the first live tick: the frame index capture should start from.
    pub first_live: Option<u64>,
    /// What the frame shows.
    pub kind: TickKind,
}

/// Offscreen tick source standing in for a display.
///
/// Emits `startup_frames` blank frames, then the presenter's frames, then blank idle frames
/// for as long as it keeps being ticked.
#[derive(Debug)]
pub struct HeadlessSurface {
    presenter: Presenter,
    canvas: Canvas,
    startup_frames: u64,
    padding: u64,
    produced: u64,
    first_live: Option<u64>,
}

impl HeadlessSurface {
    /// Surface emitting `startup_frames` blank frames before `presenter` starts.
    pub fn new(presenter: Presenter, canvas: Canvas, startup_frames: u64) -> Self {
        Self {
            presenter,
            canvas,
            startup_frames,
            padding: 0,
            produced: 0,
            first_live: None,
        }
    }

    /// Number of live frames to report as pre-roll after the first stimulus draw.
    pub fn with_padding(mut self, padding: u64) -> Self {
        self.padding = padding;
        self
    }

    /// The presenter being driven.
    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    /// Frames emitted so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Index reported as the first live frame, once known.
    pub fn first_live(&self) -> Option<u64> {
        self.first_live
    }

    /// `true` once presentation has finished and only idle frames remain.
    pub fn is_idle(&self) -> bool {
        self.presenter.is_complete()
    }

    /// Emit the next frame.
    pub fn tick(&mut self, source: &mut dyn StimulusSource) -> EyeCandyResult<SurfaceTick> {
        let index = self.produced;
        self.produced += 1;

        if index < self.startup_frames {
            return Ok(self.blank(index, TickKind::PreRoll));
        }
        match self.presenter.next_frame(source)? {
            Some(frame) => {
                let first_live = match self.first_live {
                    Some(_) => None,
                    None => {
                        let first = index + self.padding;
                        self.first_live = Some(first);
                        tracing::debug!(index, first_live = first, "presentation started");
                        Some(first)
                    }
                };
                Ok(SurfaceTick {
                    index,
                    frame,
                    first_live,
                    kind: TickKind::Live,
                })
            }
            None => Ok(self.blank(index, TickKind::Idle)),
        }
    }

    fn blank(&self, index: u64, kind: TickKind) -> SurfaceTick {
        SurfaceTick {
            index,
            frame: FrameBuffer::filled(self.canvas, Color::BLACK),
            first_live: None,
            kind,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
