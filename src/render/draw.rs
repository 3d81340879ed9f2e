use crate::foundation::color::Color;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::frame::FrameBuffer;
use crate::render::images::ImageCache;
use crate::stimulus::spec::{StimulusKind, StimulusSpec, StimulusTag};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Per-frame inputs shared by every draw routine.
#[derive(Clone, Copy, Debug)]
pub struct DrawContext<'a> {
    /// Frame size.
    pub canvas: Canvas,
    /// Presentation frame rate.
    pub fps: Fps,
    /// Run seed, mixed into procedural noise.
    pub seed: u32,
    /// Position of the stimulus in the program's sequence.
    pub stimulus_index: u64,
    /// Frame number within the stimulus.
    pub frame: u64,
    /// Decoded images for `IMAGE` stimuli.
    pub images: &'a ImageCache,
}

/// Draw one frame of `spec` over a frame already filled with its background.
pub type DrawFn = fn(&StimulusSpec, &DrawContext<'_>, &mut FrameBuffer) -> EyeCandyResult<()>;

/// Dispatch table from stimulus kind to draw routine.
#[derive(Clone, Copy)]
pub struct DrawTable {
    entries: [DrawFn; StimulusTag::ALL.len()],
}

impl Default for DrawTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DrawTable {
    /// Built-in routines for every kind.
    pub fn standard() -> Self {
        // Order follows `StimulusTag::ALL`.
        let entries: [DrawFn; StimulusTag::ALL.len()] = [
            draw_bar,
            draw_checkerboard,
            draw_chirp,
            draw_grating,
            draw_sinusoidal_grating,
            draw_image,
            draw_background_only,
            draw_background_only,
            draw_background_only,
            draw_background_only,
            draw_background_only,
            draw_white_noise,
            draw_background_only,
        ];
        Self { entries }
    }

    /// Replace the routine for `tag`.
    pub fn with_entry(mut self, tag: StimulusTag, draw: DrawFn) -> Self {
        self.entries[tag.index()] = draw;
        self
    }

    /// Render one frame of `spec`.
    pub fn render(&self, spec: &StimulusSpec, ctx: &DrawContext<'_>) -> EyeCandyResult<FrameBuffer> {
        let mut frame = FrameBuffer::filled(ctx.canvas, spec.background_color());
        (self.entries[spec.tag().index()])(spec, ctx, &mut frame)?;
        Ok(frame)
    }
}

impl std::fmt::Debug for DrawTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawTable").finish_non_exhaustive()
    }
}

/// Shade every pixel in parallel rows; `shade` receives pixel-center coordinates.
fn shade<F>(frame: &mut FrameBuffer, f: F)
where
    F: Fn(f64, f64) -> Option<[u8; 4]> + Sync,
{
    let stride = frame.stride();
    frame
        .data
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let cy = y as f64 + 0.5;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                if let Some(rgba) = f(x as f64 + 0.5, cy) {
                    px.copy_from_slice(&rgba);
                }
            }
        });
}

/// Map a canvas point into a frame translated to `origin` and rotated by `-angle`.
fn to_local(x: f64, y: f64, origin: (f64, f64), angle: f64) -> (f64, f64) {
    let (dx, dy) = (x - origin.0, y - origin.1);
    let (s, c) = angle.sin_cos();
    (dx * c - dy * s, dx * s + dy * c)
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
        .round()
        .clamp(0.0, 255.0) as u8
}

fn draw_background_only(
    spec: &StimulusSpec,
    ctx: &DrawContext<'_>,
    _frame: &mut FrameBuffer,
) -> EyeCandyResult<()> {
    if ctx.frame == 0 && !matches!(spec.kind(), StimulusKind::Wait | StimulusKind::Solid) {
        tracing::debug!(kind = spec.tag().label(), "drawing background only");
    }
    Ok(())
}

/// A bar of `width` sweeping toward the center from half a diagonal away.
fn draw_bar(spec: &StimulusSpec, ctx: &DrawContext<'_>, frame: &mut FrameBuffer) -> EyeCandyResult<()> {
    let StimulusKind::Bar {
        speed,
        width,
        angle,
        bar_color,
    } = *spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::Bar));
    };
    let diag = ctx.canvas.diagonal();
    let r = diag / 2.0 - speed * spec.age();
    let (s, c) = (-angle).sin_cos();
    let origin = (
        (width / 2.0 + r) * c + f64::from(ctx.canvas.width) / 2.0,
        (width / 2.0 + r) * s + f64::from(ctx.canvas.height) / 2.0,
    );
    let px = bar_color.to_opaque_rgba();
    shade(frame, |x, y| {
        let (u, v) = to_local(x, y, origin, angle);
        let inside = u >= -width / 2.0 && u < width / 2.0 && v >= -diag / 2.0 && v < diag / 2.0;
        inside.then_some(px)
    });
    Ok(())
}

/// Square cells of `size`, anchored at the canvas origin or rotated about the center.
fn draw_checkerboard(
    spec: &StimulusSpec,
    ctx: &DrawContext<'_>,
    frame: &mut FrameBuffer,
) -> EyeCandyResult<()> {
    let StimulusKind::Checkerboard {
        color,
        alternate_color,
        size,
        angle,
    } = *spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::Checkerboard));
    };
    let diag = ctx.canvas.diagonal();
    let center = (
        f64::from(ctx.canvas.width) / 2.0,
        f64::from(ctx.canvas.height) / 2.0,
    );
    let (on, off) = (color.to_opaque_rgba(), alternate_color.to_opaque_rgba());
    shade(frame, |x, y| {
        let (u, v) = if angle == 0.0 {
            (x, y)
        } else {
            let (u, v) = to_local(x, y, center, angle);
            (u + diag / 2.0, v + diag / 2.0)
        };
        let parity = ((u / size).floor() as i64 + (v / size).floor() as i64).rem_euclid(2);
        Some(if parity == 0 { on } else { off })
    });
    Ok(())
}

/// Full-field gray modulated by a linear chirp around mid-gray.
fn draw_chirp(spec: &StimulusSpec, _ctx: &DrawContext<'_>, frame: &mut FrameBuffer) -> EyeCandyResult<()> {
    let StimulusKind::Chirp {
        f0,
        f1,
        a0,
        a1,
        t1,
        phi,
    } = *spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::Chirp));
    };
    let v = chirp_value(spec.age(), f0, f1, a0, a1, t1, phi);
    let px = Color::gray(v).to_opaque_rgba();
    for chunk in frame.data.chunks_exact_mut(4) {
        chunk.copy_from_slice(&px);
    }
    Ok(())
}

/// Gray level of a chirp at time `t`.
pub(crate) fn chirp_value(t: f64, f0: f64, f1: f64, a0: f64, a1: f64, t1: f64, phi: f64) -> u8 {
    let frac = (t / t1).min(1.0);
    let amplitude = a0 * (1.0 - frac) + a1 * frac;
    let beta = (f1 - f0) / t1;
    let phase = 2.0 * PI * (f0 * t + 0.5 * beta * t * t);
    (amplitude * (phi + phase).cos() + 127.5)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Offset of a moving grating pattern plus the pattern-space x of each canvas point.
fn grating_x(ctx: &DrawContext<'_>, age: f64, speed: f64, width: f64, angle: f64) -> impl Fn(f64, f64) -> f64 + Sync {
    let period = 2.0 * width;
    let position = (speed * age).rem_euclid(period);
    let diag = ctx.canvas.diagonal();
    let center = (
        f64::from(ctx.canvas.width) / 2.0,
        f64::from(ctx.canvas.height) / 2.0,
    );
    move |x, y| {
        let (u, _) = to_local(x, y, center, angle);
        (u + diag / 2.0 - (period - position)).rem_euclid(period)
    }
}

/// Square-wave grating: `bar_color` for the first half of each period.
fn draw_grating(spec: &StimulusSpec, ctx: &DrawContext<'_>, frame: &mut FrameBuffer) -> EyeCandyResult<()> {
    let StimulusKind::Grating {
        speed,
        width,
        angle,
        bar_color,
    } = *spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::Grating));
    };
    let px = bar_color.to_opaque_rgba();
    let pattern_x = grating_x(ctx, spec.age(), speed, width, angle);
    shade(frame, |x, y| (pattern_x(x, y) < width).then_some(px));
    Ok(())
}

/// Sinusoid between the background (trough) and `bar_color` (crest), period `2 * width`.
fn draw_sinusoidal_grating(
    spec: &StimulusSpec,
    ctx: &DrawContext<'_>,
    frame: &mut FrameBuffer,
) -> EyeCandyResult<()> {
    let StimulusKind::SinusoidalGrating {
        speed,
        width,
        angle,
        bar_color,
    } = *spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::SinusoidalGrating));
    };
    let (lo, hi) = (spec.background_color(), bar_color);
    let pattern_x = grating_x(ctx, spec.age(), speed, width, angle);
    shade(frame, |x, y| {
        let column = pattern_x(x, y).floor();
        let t = ((column / width * PI).sin() + 1.0) / 2.0;
        Some([
            lerp_channel(lo.r, hi.r, t),
            lerp_channel(lo.g, hi.g, t),
            lerp_channel(lo.b, hi.b, t),
            255,
        ])
    });
    Ok(())
}

/// Preloaded image placed so its `fixation_point` lands on the canvas center.
fn draw_image(spec: &StimulusSpec, ctx: &DrawContext<'_>, frame: &mut FrameBuffer) -> EyeCandyResult<()> {
    let StimulusKind::Image {
        image,
        fixation_point,
        scale,
    } = spec.kind()
    else {
        return Err(mismatch(spec, StimulusTag::Image));
    };
    let img = ctx.images.get(image).ok_or_else(|| {
        EyeCandyError::configuration(format!("image {image} not found in preload cache"))
    })?;
    let center = (
        f64::from(ctx.canvas.width) / 2.0,
        f64::from(ctx.canvas.height) / 2.0,
    );
    let fix = fixation_point.map_or(center, |p| (p.x, p.y));
    let (ox, oy) = (center.0 - fix.0, center.1 - fix.1);
    let (sx, sy) = scale.factors();
    let (iw, ih) = img.dimensions();
    let (dw, dh) = (f64::from(iw) * sx, f64::from(ih) * sy);
    let bg = spec.background_color();

    shade(frame, |x, y| {
        let (u, v) = (x - ox, y - oy);
        if u < 0.0 || v < 0.0 || u >= dw || v >= dh {
            return None;
        }
        let ix = ((u / sx) as u32).min(iw.saturating_sub(1));
        let iy = ((v / sy) as u32).min(ih.saturating_sub(1));
        let p = img.get_pixel(ix, iy).0;
        let [r, g, b] = Color {
            r: p[0],
            g: p[1],
            b: p[2],
            a: p[3],
        }
        .over_opaque([bg.r, bg.g, bg.b]);
        Some([r, g, b, 255])
    });
    Ok(())
}

/// Gaussian noise on a `rows` x `cols` grid stretched over the canvas, redrawn every frame.
fn draw_white_noise(
    spec: &StimulusSpec,
    ctx: &DrawContext<'_>,
    frame: &mut FrameBuffer,
) -> EyeCandyResult<()> {
    let StimulusKind::WhiteNoise { rows, cols, color } = *spec.kind() else {
        return Err(mismatch(spec, StimulusTag::WhiteNoise));
    };
    let cells: Vec<u8> = (0..u64::from(rows) * u64::from(cols))
        .into_par_iter()
        .map(|cell| noise_value(ctx.seed, ctx.stimulus_index, ctx.frame, cell))
        .collect();
    let (w, h) = (f64::from(ctx.canvas.width), f64::from(ctx.canvas.height));
    shade(frame, |x, y| {
        let col = ((x / w * f64::from(cols)) as u32).min(cols - 1);
        let row = ((y / h * f64::from(rows)) as u32).min(rows - 1);
        let n = cells[row as usize * cols as usize + col as usize];
        let scale = |c: u8| ((u16::from(c) * u16::from(n) + 127) / 255) as u8;
        Some([scale(color.r), scale(color.g), scale(color.b), 255])
    });
    Ok(())
}

/// Gamma-encoded gaussian sample for one noise cell.
///
/// Box-Muller on two uniforms drawn from an xxh3 hash of `(stimulus, frame, cell, attempt)`;
/// samples of `n / 10 + 0.5` outside `[0, 1]` are redrawn.
pub(crate) fn noise_value(seed: u32, stimulus_index: u64, frame: u64, cell: u64) -> u8 {
    let mut key = [0u8; 32];
    key[0..8].copy_from_slice(&stimulus_index.to_le_bytes());
    key[8..16].copy_from_slice(&frame.to_le_bytes());
    key[16..24].copy_from_slice(&cell.to_le_bytes());
    let mut attempt = 0u64;
    loop {
        key[24..32].copy_from_slice(&attempt.to_le_bytes());
        let h = xxhash_rust::xxh3::xxh3_64_with_seed(&key, u64::from(seed));
        let u = ((h >> 32) as f64 + 1.0) / 4_294_967_297.0;
        let v = ((h & 0xffff_ffff) as f64 + 1.0) / 4_294_967_297.0;
        let n = (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos() / 10.0 + 0.5;
        if (0.0..=1.0).contains(&n) {
            return (n.powf(1.0 / 2.2) * 255.0).round() as u8;
        }
        attempt += 1;
    }
}

fn mismatch(spec: &StimulusSpec, want: StimulusTag) -> EyeCandyError {
    EyeCandyError::configuration(format!(
        "draw routine for {} called with {}",
        want.label(),
        spec.tag().label()
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/draw.rs"]
mod tests;
