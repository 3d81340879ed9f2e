use crate::foundation::color::Color;
use crate::foundation::core::Fps;
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque analysis metadata attached to a stimulus.
pub type StimulusMetadata = BTreeMap<String, String>;

/// One timed visual event produced by a stimulus program.
///
/// `lifespan` is fixed at construction. `age` is owned by the renderer and only moves forward.
/// The wire form uses a `stimulusType` tag and camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStimulus", rename_all = "camelCase")]
pub struct StimulusSpec {
    lifespan: f64,
    background_color: Color,
    metadata: StimulusMetadata,
    age: f64,
    #[serde(flatten)]
    kind: StimulusKind,
}

/// Kind-specific parameters of a stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "stimulusType",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum StimulusKind {
    /// A bar sweeping across the canvas along `angle` (radians) at `speed` px/s.
    Bar {
        /// Sweep speed in pixels per second.
        speed: f64,
        /// Bar width in pixels.
        width: f64,
        /// Direction of travel in radians.
        angle: f64,
        /// Bar fill.
        bar_color: Color,
    },
    /// A static checkerboard with square cells of `size` px, rotated by `angle`.
    Checkerboard {
        /// Color of the cell at the origin.
        color: Color,
        /// Color of the neighbouring cells.
        alternate_color: Color,
        /// Cell edge in pixels.
        size: f64,
        /// Rotation in radians.
        #[serde(default)]
        angle: f64,
    },
    /// Full-field luminance chirp (linear frequency sweep, linear amplitude ramp).
    Chirp {
        /// Start frequency in Hz.
        f0: f64,
        /// Frequency reached at `t1`.
        f1: f64,
        /// Start amplitude.
        a0: f64,
        /// Amplitude reached at `t1`.
        a1: f64,
        /// Sweep duration in seconds.
        t1: f64,
        /// Phase offset in radians.
        #[serde(default)]
        phi: f64,
    },
    /// Moving square-wave grating.
    Grating {
        /// Drift speed in pixels per second.
        speed: f64,
        /// Bar width in pixels (half a period).
        width: f64,
        /// Drift direction in radians.
        angle: f64,
        /// Bar fill.
        bar_color: Color,
    },
    /// Moving sinusoidal grating between the background and `bar_color`.
    SinusoidalGrating {
        /// Drift speed in pixels per second.
        speed: f64,
        /// Half period in pixels.
        width: f64,
        /// Drift direction in radians.
        angle: f64,
        /// Peak color.
        bar_color: Color,
    },
    /// A still image loaded from `image`.
    Image {
        /// Path, relative to the program file.
        image: String,
        /// Where the image center lands.
        #[serde(default)]
        fixation_point: Option<FixationPoint>,
        /// Scale applied before placement.
        #[serde(default)]
        scale: ImageScale,
    },
    /// A single letter at `(x, y)`.
    Letter {
        /// Glyph to draw.
        letter: String,
        /// Horizontal position in pixels.
        x: f64,
        /// Vertical position in pixels.
        y: f64,
        /// Glyph size in pixels.
        size: f64,
        /// Glyph color.
        color: Color,
    },
    /// A letter tiled across the canvas.
    TiledLetter {
        /// Glyph to tile.
        letter: String,
        /// Glyph size in pixels.
        size: f64,
        /// Gap between tiles in pixels.
        padding: f64,
        /// Glyph color.
        color: Color,
        /// Tile grid rotation in radians.
        #[serde(default)]
        angle: f64,
    },
    /// A matrix of letters.
    #[serde(rename = "EYECHART")]
    EyeChart {
        /// Rows of glyphs.
        letter_matrix: Vec<Vec<String>>,
        /// Glyph size in pixels.
        size: f64,
        /// Gap between glyphs in pixels.
        padding: f64,
        /// Glyph color.
        color: Color,
    },
    /// Background color only.
    Solid,
    /// A clip played from `src` starting at `start_time` seconds.
    Video {
        /// Clip path.
        src: String,
        /// Offset into the clip in seconds.
        #[serde(default)]
        start_time: f64,
    },
    /// Per-frame gaussian white noise on a `rows` x `cols` grid.
    WhiteNoise {
        /// Noise grid rows.
        rows: u32,
        /// Noise grid columns.
        cols: u32,
        /// Color scaled by each cell's intensity.
        #[serde(default = "white")]
        color: Color,
    },
    /// Blank interval.
    Wait,
}

fn white() -> Color {
    Color::WHITE
}

/// Image anchor in canvas pixels; defaults to the canvas center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixationPoint {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
}

/// Image scale factor, uniform or per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageScale {
    /// Same factor on both axes.
    Uniform(f64),
    /// `[x, y]` factors.
    Axes([f64; 2]),
}

impl Default for ImageScale {
    fn default() -> Self {
        Self::Uniform(1.0)
    }
}

impl ImageScale {
    /// `(sx, sy)` factors.
    pub fn factors(self) -> (f64, f64) {
        match self {
            Self::Uniform(s) => (s, s),
            Self::Axes([x, y]) => (x, y),
        }
    }
}

/// Discriminant of [`StimulusKind`], used to index the draw table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StimulusTag {
    /// [`StimulusKind::Bar`].
    Bar,
    /// [`StimulusKind::Checkerboard`].
    Checkerboard,
    /// [`StimulusKind::Chirp`].
    Chirp,
    /// [`StimulusKind::Grating`].
    Grating,
    /// [`StimulusKind::SinusoidalGrating`].
    SinusoidalGrating,
    /// [`StimulusKind::Image`].
    Image,
    /// [`StimulusKind::Letter`].
    Letter,
    /// [`StimulusKind::TiledLetter`].
    TiledLetter,
    /// [`StimulusKind::EyeChart`].
    EyeChart,
    /// [`StimulusKind::Solid`].
    Solid,
    /// [`StimulusKind::Video`].
    Video,
    /// [`StimulusKind::WhiteNoise`].
    WhiteNoise,
    /// [`StimulusKind::Wait`].
    Wait,
}

impl StimulusTag {
    /// Every tag, in table order.
    pub const ALL: [Self; 13] = [
        Self::Bar,
        Self::Checkerboard,
        Self::Chirp,
        Self::Grating,
        Self::SinusoidalGrating,
        Self::Image,
        Self::Letter,
        Self::TiledLetter,
        Self::EyeChart,
        Self::Solid,
        Self::Video,
        Self::WhiteNoise,
        Self::Wait,
    ];

    /// Position in [`StimulusTag::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name of the kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bar => "BAR",
            Self::Checkerboard => "CHECKERBOARD",
            Self::Chirp => "CHIRP",
            Self::Grating => "GRATING",
            Self::SinusoidalGrating => "SINUSOIDAL_GRATING",
            Self::Image => "IMAGE",
            Self::Letter => "LETTER",
            Self::TiledLetter => "TILED_LETTER",
            Self::EyeChart => "EYECHART",
            Self::Solid => "SOLID",
            Self::Video => "VIDEO",
            Self::WhiteNoise => "WHITE_NOISE",
            Self::Wait => "WAIT",
        }
    }
}

impl StimulusKind {
    /// Discriminant of this kind.
    pub fn tag(&self) -> StimulusTag {
        match self {
            Self::Bar { .. } => StimulusTag::Bar,
            Self::Checkerboard { .. } => StimulusTag::Checkerboard,
            Self::Chirp { .. } => StimulusTag::Chirp,
            Self::Grating { .. } => StimulusTag::Grating,
            Self::SinusoidalGrating { .. } => StimulusTag::SinusoidalGrating,
            Self::Image { .. } => StimulusTag::Image,
            Self::Letter { .. } => StimulusTag::Letter,
            Self::TiledLetter { .. } => StimulusTag::TiledLetter,
            Self::EyeChart { .. } => StimulusTag::EyeChart,
            Self::Solid => StimulusTag::Solid,
            Self::Video { .. } => StimulusTag::Video,
            Self::WhiteNoise { .. } => StimulusTag::WhiteNoise,
            Self::Wait => StimulusTag::Wait,
        }
    }

    /// Background used when the program does not name one.
    pub fn default_background(&self) -> Color {
        match self {
            Self::Solid => Color::WHITE,
            Self::Checkerboard {
                alternate_color, ..
            } => *alternate_color,
            _ => Color::BLACK,
        }
    }

    fn validate(&self) -> Result<(), String> {
        fn positive(name: &str, v: f64) -> Result<(), String> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(format!("{name} must be a positive number (got {v})"))
            }
        }
        fn finite(name: &str, v: f64) -> Result<(), String> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(format!("{name} must be finite"))
            }
        }

        match self {
            Self::Bar {
                speed,
                width,
                angle,
                ..
            }
            | Self::Grating {
                speed,
                width,
                angle,
                ..
            }
            | Self::SinusoidalGrating {
                speed,
                width,
                angle,
                ..
            } => {
                finite("speed", *speed)?;
                positive("width", *width)?;
                finite("angle", *angle)
            }
            Self::Checkerboard { size, angle, .. } => {
                positive("size", *size)?;
                finite("angle", *angle)
            }
            Self::Chirp {
                f0,
                f1,
                a0,
                a1,
                t1,
                phi,
            } => {
                finite("f0", *f0)?;
                finite("f1", *f1)?;
                finite("a0", *a0)?;
                finite("a1", *a1)?;
                positive("t1", *t1)?;
                finite("phi", *phi)
            }
            Self::WhiteNoise { rows, cols, .. } => {
                if *rows == 0 || *cols == 0 {
                    return Err("white noise rows/cols must be non-zero".to_owned());
                }
                Ok(())
            }
            Self::Letter { size, .. }
            | Self::TiledLetter { size, .. }
            | Self::EyeChart { size, .. } => positive("size", *size),
            Self::Image { scale, .. } => {
                let (sx, sy) = scale.factors();
                positive("scale x", sx)?;
                positive("scale y", sy)
            }
            Self::Video { start_time, .. } => finite("startTime", *start_time),
            Self::Solid | Self::Wait => Ok(()),
        }
    }
}

impl StimulusSpec {
    /// Create a stimulus. `background` falls back to the kind's default.
    pub fn new(lifespan: f64, background: Option<Color>, kind: StimulusKind) -> EyeCandyResult<Self> {
        Self::build(lifespan, background, StimulusMetadata::new(), 0.0, kind)
            .map_err(|e| EyeCandyError::configuration(format!("invalid stimulus: {e}")))
    }

    /// Blank interval with a black background.
    pub fn wait(lifespan: f64) -> EyeCandyResult<Self> {
        Self::new(lifespan, None, StimulusKind::Wait)
    }

    /// Solid color field.
    pub fn solid(lifespan: f64, color: Color) -> EyeCandyResult<Self> {
        Self::new(lifespan, Some(color), StimulusKind::Solid)
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn build(
        lifespan: f64,
        background: Option<Color>,
        metadata: StimulusMetadata,
        age: f64,
        kind: StimulusKind,
    ) -> Result<Self, String> {
        if !lifespan.is_finite() || lifespan < 0.0 {
            return Err(format!(
                "lifespan must be a finite number >= 0 (got {lifespan})"
            ));
        }
        if !age.is_finite() || age < 0.0 {
            return Err(format!("age must be a finite number >= 0 (got {age})"));
        }
        kind.validate()?;
        let background_color = background.unwrap_or_else(|| kind.default_background());
        Ok(Self {
            lifespan,
            background_color,
            metadata,
            age,
            kind,
        })
    }

    /// Presentation duration in seconds.
    pub fn lifespan(&self) -> f64 {
        self.lifespan
    }

    /// Background fill.
    pub fn background_color(&self) -> Color {
        self.background_color
    }

    /// Analysis metadata.
    pub fn metadata(&self) -> &StimulusMetadata {
        &self.metadata
    }

    /// Elapsed presentation time in seconds.
    pub fn age(&self) -> f64 {
        self.age
    }

    /// Kind-specific parameters.
    pub fn kind(&self) -> &StimulusKind {
        &self.kind
    }

    /// Discriminant of the kind.
    pub fn tag(&self) -> StimulusTag {
        self.kind.tag()
    }

    /// Advance `age` by `dt` seconds. Non-positive or non-finite steps are ignored.
    pub fn advance_age(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.age += dt;
        }
    }

    /// Number of display frames this stimulus occupies.
    pub fn frame_count(&self, fps: Fps) -> u64 {
        fps.secs_to_frames_round(self.lifespan)
    }

    /// Path of the image to preload, for image stimuli.
    pub fn image_path(&self) -> Option<&str> {
        match &self.kind {
            StimulusKind::Image { image, .. } => Some(image),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStimulus {
    lifespan: f64,
    #[serde(default)]
    background_color: Option<Color>,
    #[serde(default, deserialize_with = "metadata_from_scalars")]
    metadata: StimulusMetadata,
    #[serde(default)]
    age: f64,
    #[serde(flatten)]
    kind: StimulusKind,
}

impl TryFrom<RawStimulus> for StimulusSpec {
    type Error = String;

    fn try_from(raw: RawStimulus) -> Result<Self, Self::Error> {
        Self::build(
            raw.lifespan,
            raw.background_color,
            raw.metadata,
            raw.age,
            raw.kind,
        )
    }
}

/// Metadata values may be any JSON scalar; they are kept as strings.
fn metadata_from_scalars<'de, D>(deserializer: D) -> Result<StimulusMetadata, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    let mut out = StimulusMetadata::new();
    for (k, v) in raw.unwrap_or_default() {
        let s = match v {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => continue,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(serde::de::Error::custom(format!(
                    "metadata value for \"{k}\" must be a scalar"
                )));
            }
            other => other.to_string(),
        };
        out.insert(k, s);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/stimulus/spec.rs"]
mod tests;
