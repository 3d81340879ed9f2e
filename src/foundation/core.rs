use crate::foundation::error::{EyeCandyError, EyeCandyResult};

/// Absolute 0-based frame index.
///
/// Depending on context this is either a producer-side index (counting pre-roll frames) or a
/// recording-local index (0 = first live stimulus frame).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Integer frames-per-second of the display and of the recorded video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(u32);

impl Fps {
    /// Create a validated FPS value. Zero is a configuration error.
    pub fn new(fps: u32) -> EyeCandyResult<Self> {
        if fps == 0 {
            return Err(EyeCandyError::configuration("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    /// Frames per second as an integer.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        1.0 / self.as_f64()
    }

    /// Tick interval of a display running at this rate.
    pub fn tick_interval(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_duration_secs())
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to a frame count, rounding to the nearest frame.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, rejecting empty dimensions.
    pub fn new(width: u32, height: u32) -> EyeCandyResult<Self> {
        if width == 0 || height == 0 {
            return Err(EyeCandyError::configuration(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Length of the canvas diagonal in pixels.
    pub fn diagonal(self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }

    /// Number of bytes in a tightly packed RGBA8 frame of this size.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
