use crate::foundation::core::{Canvas, Fps};
use std::path::PathBuf;

/// Frame-level plan for one run, fixed once generation finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct RunPlan {
    /// Frame size.
    pub canvas: Canvas,
    /// Frame rate.
    pub fps: Fps,
    /// Summed lifespan of every generated stimulus.
    pub total_duration_secs: f64,
    /// Stimuli generated.
    pub stimulus_count: u64,
    /// `round(total_duration_secs * fps)`.
    pub expected_frame_count: u64,
    /// Encoded video path; `None` for dry runs.
    pub output_target: Option<PathBuf>,
}

impl RunPlan {
    /// Plan for a finished generation pass; the frame count is derived.
    pub fn new(
        canvas: Canvas,
        fps: Fps,
        total_duration_secs: f64,
        stimulus_count: u64,
        output_target: Option<PathBuf>,
    ) -> Self {
        Self {
            canvas,
            fps,
            total_duration_secs,
            stimulus_count,
            expected_frame_count: expected_frame_count(total_duration_secs, fps),
            output_target,
        }
    }
}

/// Number of frames needed to present `total_secs` at `fps`.
pub fn expected_frame_count(total_secs: f64, fps: Fps) -> u64 {
    fps.secs_to_frames_round(total_secs)
}

/// Generation summary line, e.g. `"12 total, 1 hours, 2 mins, 3.5 sec"`.
///
/// Hours are omitted when zero; minutes are omitted when both hours and minutes are zero.
pub fn format_duration(stimulus_count: u64, total_secs: f64) -> String {
    let total = if total_secs.is_finite() {
        total_secs.max(0.0)
    } else {
        0.0
    };
    let secs = total % 60.0;
    let total_mins = ((total - secs) / 60.0).round() as u64;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    let mut out = format!("{stimulus_count} total, ");
    if hours > 0 {
        out.push_str(&format!("{hours} hours, "));
    }
    if hours > 0 || mins > 0 {
        out.push_str(&format!("{mins} mins, "));
    }
    out.push_str(&format!("{secs:.1} sec"));
    out
}
