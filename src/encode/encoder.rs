use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::frame::FrameBuffer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque id assigned by an encoder to a submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(pub u64);

/// Output settings handed to [`VideoEncoder::open`].
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderConfig {
    /// Frame size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Video file to write.
    pub out_path: PathBuf,
    /// Replace an existing file at `out_path`.
    pub overwrite: bool,
}

impl EncoderConfig {
    /// Settings writing `out_path`, overwriting any existing file.
    pub fn new(out_path: impl Into<PathBuf>, canvas: Canvas, fps: Fps) -> Self {
        Self {
            canvas,
            fps,
            out_path: out_path.into(),
            overwrite: true,
        }
    }

    /// Reject sizes the yuv420p output cannot carry.
    pub fn validate(&self) -> EyeCandyResult<()> {
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(EyeCandyError::configuration(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// What `probe` learned about the encoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncoderInfo {
    /// Encoder name.
    pub name: String,
    /// Reported version string.
    pub version: String,
}

/// Asynchronous frame encoder.
///
/// `submit` never waits for encoding; completed ids are collected with `check_completed`, in
/// any order. A frame's buffer stays alive at least until its id is reported.
pub trait VideoEncoder: Send {
    /// Check that the encoder is reachable and compatible.
    fn probe(&mut self) -> EyeCandyResult<EncoderInfo>;
    /// Start an output.
    fn open(&mut self, cfg: &EncoderConfig) -> EyeCandyResult<()>;
    /// Queue one frame.
    fn submit(&mut self, frame: Arc<FrameBuffer>) -> EyeCandyResult<FrameId>;
    /// Ids finished since the previous call.
    fn check_completed(&mut self) -> EyeCandyResult<Vec<FrameId>>;
    /// Finish the output after every frame has completed.
    fn close(&mut self) -> EyeCandyResult<()>;
    /// Tear down without draining. Safe to call in any state, repeatedly.
    fn abort(&mut self);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> EyeCandyResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
