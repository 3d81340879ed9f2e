//! eyecandy generates seed-reproducible visual stimulus sequences and records them frame-exactly
//! to video.
//!
//! - Compile a stimulus program through a [`ProgramHost`] into a [`ProgramEngine`]
//! - Generate stimuli into a [`StimulusQueue`] with duration accounting
//! - Drive a [`RunController`] (or let a [`Runner`] drive it) to capture frames into a
//!   [`VideoEncoder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod capture;
pub(crate) mod encode;
pub(crate) mod program;
pub(crate) mod queue;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod stimulus;

pub use crate::foundation::color::Color;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{EyeCandyError, EyeCandyResult, ProgramError};

pub use crate::capture::coordinator::{CapturePhase, FrameCoordinator, FrameDisposition};
pub use crate::capture::poller::{CompletionPoller, PollControl, PollGuard};
pub use crate::capture::tracker::{CompletionTracker, FrameCounters, PollReport, Progress};
pub use crate::encode::encoder::{EncoderConfig, EncoderInfo, FrameId, VideoEncoder};
pub use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts, parse_ffmpeg_version};
pub use crate::encode::memory::{CompletionMode, InMemoryEncoder, MemoryEncoderHandle};
pub use crate::program::declarative::{DeclarativeHost, ProgramDoc};
pub use crate::program::engine::ProgramEngine;
pub use crate::program::host::{ProgramHost, ProgramMetadata, ProgramNext, ProgramSession};
pub use crate::program::random::DeterministicRandom;
pub use crate::queue::plan::{RunPlan, expected_frame_count, format_duration};
pub use crate::queue::stimulus_queue::{
    GenerationSlice, GenerationStatus, SliceStats, StimulusQueue,
};
pub use crate::render::draw::{DrawContext, DrawFn, DrawTable};
pub use crate::render::frame::FrameBuffer;
pub use crate::render::images::ImageCache;
pub use crate::render::presenter::{Presenter, PresenterState, StimulusSource};
pub use crate::render::surface::{
    DEFAULT_PREROLL_PADDING_FRAMES, HeadlessSurface, SurfaceTick, TickKind,
};
pub use crate::session::config::RunConfig;
pub use crate::session::notify::{
    HostNotifier, Notification, RecordingNotifier, RunOutcome, TracingNotifier,
};
pub use crate::session::output::{OutputLayout, RunInfo};
pub use crate::session::run::{RunController, RunState};
pub use crate::session::runner::Runner;
pub use crate::stimulus::spec::{
    FixationPoint, ImageScale, StimulusKind, StimulusMetadata, StimulusSpec, StimulusTag,
};
