use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// Every expected frame was encoded.
    Completed {
        /// Frames written to the video.
        frames: u64,
        /// Path of the encoded video.
        output: PathBuf,
    },
    /// Generation finished and encoding was not requested (or there was nothing to encode).
    DryRunCompleted {
        /// Stimuli generated.
        stimuli: u64,
        /// Summed stimulus lifespan in seconds.
        duration_secs: f64,
    },
    /// Stopped by an explicit cancel request.
    Cancelled,
    /// Stopped by an unrecoverable error.
    Failed {
        /// Error category, see [`EyeCandyError::kind_label`](crate::EyeCandyError::kind_label).
        kind: &'static str,
        /// Human-readable error.
        message: String,
    },
}

impl RunOutcome {
    /// `true` for both completion outcomes.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::DryRunCompleted { .. })
    }
}

/// Outward notifications a run emits to whatever hosts it.
pub trait HostNotifier: Send + Sync {
    /// A human-readable log line.
    fn on_log(&self, message: &str);
    /// Frames encoded so far out of the frames expected.
    fn on_progress(&self, frames_done: u64, frames_total: u64);
    /// Emitted exactly once when a run reaches a terminal state.
    fn on_run_stopped(&self, outcome: &RunOutcome);
}

/// Forwards notifications to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl HostNotifier for TracingNotifier {
    fn on_log(&self, message: &str) {
        tracing::info!(target: "eyecandy::host", "{message}");
    }

    fn on_progress(&self, frames_done: u64, frames_total: u64) {
        tracing::debug!(target: "eyecandy::host", frames_done, frames_total, "progress");
    }

    fn on_run_stopped(&self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Failed { kind, message } => {
                tracing::error!(target: "eyecandy::host", kind, "run failed: {message}");
            }
            other => tracing::info!(target: "eyecandy::host", outcome = ?other, "run stopped"),
        }
    }
}

/// One recorded notification.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// [`HostNotifier::on_log`].
    Log(String),
    /// [`HostNotifier::on_progress`].
    Progress {
        /// Frames encoded so far.
        frames_done: u64,
        /// Frames expected.
        frames_total: u64,
    },
    /// [`HostNotifier::on_run_stopped`].
    Stopped(RunOutcome),
}

/// Keeps every notification in memory. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification so far, oldest first.
    pub fn events(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Log lines only.
    pub fn logs(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Log(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Run-stopped outcomes only.
    pub fn stops(&self) -> Vec<RunOutcome> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Stopped(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent progress report.
    pub fn last_progress(&self) -> Option<(u64, u64)> {
        self.lock().iter().rev().find_map(|n| match n {
            Notification::Progress {
                frames_done,
                frames_total,
            } => Some((*frames_done, *frames_total)),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, n: Notification) {
        self.lock().push(n);
    }
}

impl HostNotifier for RecordingNotifier {
    fn on_log(&self, message: &str) {
        self.push(Notification::Log(message.to_owned()));
    }

    fn on_progress(&self, frames_done: u64, frames_total: u64) {
        self.push(Notification::Progress {
            frames_done,
            frames_total,
        });
    }

    fn on_run_stopped(&self, outcome: &RunOutcome) {
        self.push(Notification::Stopped(outcome.clone()));
    }
}
