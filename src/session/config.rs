use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::queue::stimulus_queue::GenerationSlice;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parameters of one recording run.
///
/// Loaded from JSON with every field optional; unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Name recorded in the run info.
    pub program_name: String,
    /// Seed of the program's random source.
    pub seed: u32,
    /// Canvas width in pixels; must be even.
    pub width: u32,
    /// Canvas height in pixels; must be even.
    pub height: u32,
    /// Frames per second of the presentation and the video.
    pub fps: u32,
    /// Stop generating once this many seconds are queued. `0` disables the cap.
    pub limit_seconds: f64,
    /// Directory that receives the run directory.
    pub output_root: PathBuf,
    /// Run directory and artifact file stem.
    pub output_name: String,
    /// Write every generated stimulus to `<name>.stim`.
    pub save_stimuli: bool,
    /// Generate stimuli only; never touch the encoder.
    pub compile_only: bool,
    /// ffmpeg executable.
    pub ffmpeg_path: PathBuf,
    /// Value passed to ffmpeg's `-c:v`.
    pub video_codec: String,
    /// Period of the encoder completion poll.
    pub poll_interval_ms: u64,
    /// Stimuli handed to the presenter per reload.
    pub batch_size: usize,
    /// Presenter queue length at which the next batch is requested.
    pub reload_threshold: usize,
    /// Work done per generation step before control returns to the caller.
    pub generation_slice: GenerationSlice,
    /// Blank frames the surface emits before presentation.
    pub startup_frames: u64,
    /// Live frames still treated as pre-roll after the first stimulus draw.
    pub preroll_padding: u64,
    /// Pace the tick loop at `fps` instead of running flat out.
    pub realtime: bool,
    /// Rayon worker count for drawing; `None` uses the global default.
    pub render_threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            program_name: "program".to_owned(),
            seed: 0,
            width: 1280,
            height: 800,
            fps: 60,
            limit_seconds: 0.0,
            output_root: PathBuf::from("renders"),
            output_name: "eyecandy".to_owned(),
            save_stimuli: true,
            compile_only: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_owned(),
            poll_interval_ms: 30,
            batch_size: 50,
            reload_threshold: 25,
            generation_slice: GenerationSlice::default(),
            startup_frames: 2,
            preroll_padding: 0,
            realtime: false,
            render_threads: None,
        }
    }
}

impl RunConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> EyeCandyResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read run config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| EyeCandyError::serde(format!("run config '{}': {e}", path.display())))?;
        Ok(cfg)
    }

    /// Reject parameters no run can start with.
    pub fn validate(&self) -> EyeCandyResult<()> {
        if self.fps == 0 {
            return Err(EyeCandyError::configuration("fps must be > 0"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(EyeCandyError::configuration(
                "width and height must be non-zero",
            ));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(EyeCandyError::configuration(format!(
                "width and height must be even for yuv420p output (got {}x{})",
                self.width, self.height
            )));
        }
        if !self.limit_seconds.is_finite() || self.limit_seconds < 0.0 {
            return Err(EyeCandyError::configuration(
                "limit_seconds must be a finite number >= 0",
            ));
        }
        if self.batch_size == 0 {
            return Err(EyeCandyError::configuration("batch_size must be > 0"));
        }
        if self.reload_threshold >= self.batch_size {
            return Err(EyeCandyError::configuration(format!(
                "reload_threshold ({}) must be smaller than batch_size ({})",
                self.reload_threshold, self.batch_size
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(EyeCandyError::configuration("poll_interval_ms must be > 0"));
        }
        if self.generation_slice.max_stimuli == 0 {
            return Err(EyeCandyError::configuration(
                "generation_slice.max_stimuli must be > 0",
            ));
        }
        if self.output_name.trim().is_empty() {
            return Err(EyeCandyError::configuration("output_name must not be empty"));
        }
        if let Some(n) = self.render_threads
            && n == 0
        {
            return Err(EyeCandyError::configuration(
                "render_threads must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Validated canvas size.
    pub fn canvas(&self) -> EyeCandyResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    /// Validated frame rate.
    pub fn fps(&self) -> EyeCandyResult<Fps> {
        Fps::new(self.fps)
    }

    /// Completion poll period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
