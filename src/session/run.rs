use crate::capture::coordinator::{FrameCoordinator, FrameDisposition};
use crate::capture::poller::PollControl;
use crate::capture::tracker::FrameCounters;
use crate::encode::encoder::{EncoderConfig, EncoderInfo, VideoEncoder};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::program::engine::ProgramEngine;
use crate::program::host::{ProgramHost, ProgramMetadata};
use crate::queue::plan::RunPlan;
use crate::queue::stimulus_queue::{GenerationStatus, StimulusQueue};
use crate::render::frame::FrameBuffer;
use crate::session::config::RunConfig;
use crate::session::notify::{HostNotifier, RunOutcome};
use crate::session::output::{OutputLayout, RunInfo};
use crate::stimulus::spec::StimulusSpec;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Lifecycle state of a [`RunController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No run; ready to start.
    Idle,
    /// Compiling and initializing the program.
    Compiling,
    /// Pulling stimuli from the program into the queue.
    Generating,
    /// Probing and opening the encoder.
    CheckingEncoder,
    /// Capturing frames into the encoder.
    Encoding,
    /// Finished successfully.
    Complete,
    /// Stopped by [`RunController::cancel`].
    Cancelled,
    /// Stopped by an error.
    Failed,
}

impl RunState {
    /// `true` once the run has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }

    /// `true` while a run holds resources.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::Idle
    }
}

/// Everything owned by the run in progress. Dropped wholesale whenever the run stops.
struct RunContext {
    config: RunConfig,
    layout: OutputLayout,
    engine: ProgramEngine,
    queue: StimulusQueue,
    plan: Option<RunPlan>,
    coordinator: Option<FrameCoordinator>,
    encoder_info: Option<EncoderInfo>,
}

/// Drives one run at a time through compile, generation, encoder checks and capture.
///
/// Every entry point is a short, non-blocking step; the caller (usually a
/// [`Runner`](crate::session::runner::Runner)) supplies the ticks.
pub struct RunController {
    host: Arc<dyn ProgramHost>,
    encoder: Box<dyn VideoEncoder>,
    notifier: Arc<dyn HostNotifier>,
    state: RunState,
    ctx: Option<RunContext>,
    encoder_open: bool,
    outcome: Option<RunOutcome>,
    last_plan: Option<RunPlan>,
    last_summary: Option<String>,
}

impl RunController {
    /// Controller compiling programs with `host`, encoding into `encoder`.
    pub fn new(
        host: Arc<dyn ProgramHost>,
        encoder: Box<dyn VideoEncoder>,
        notifier: Arc<dyn HostNotifier>,
    ) -> Self {
        Self {
            host,
            encoder,
            notifier,
            state: RunState::Idle,
            ctx: None,
            encoder_open: false,
            outcome: None,
            last_plan: None,
            last_summary: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Outcome of the last finished run.
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Plan of the current run, or of the last run that got far enough to have one.
    pub fn plan(&self) -> Option<&RunPlan> {
        self.ctx
            .as_ref()
            .and_then(|c| c.plan.as_ref())
            .or(self.last_plan.as_ref())
    }

    /// Frame counters of the capture in progress; zeroed outside capture.
    pub fn counters(&self) -> FrameCounters {
        self.coordinator().map(|c| c.counters()).unwrap_or_default()
    }

    /// Frames submitted to the encoder and not yet completed.
    pub fn pending_len(&self) -> usize {
        self.coordinator().map_or(0, |c| c.tracker().pending_len())
    }

    /// Frame coordinator, present only while encoding.
    pub fn coordinator(&self) -> Option<&FrameCoordinator> {
        self.ctx.as_ref().and_then(|c| c.coordinator.as_ref())
    }

    /// Stimuli pulled from the current program session, if one is live.
    pub fn program_yielded(&self) -> Option<u64> {
        self.ctx.as_ref().map(|c| c.engine.yielded())
    }

    /// Metadata of the live program session.
    pub fn program_metadata(&self) -> Option<&ProgramMetadata> {
        self.ctx.as_ref().map(|c| c.engine.metadata())
    }

    /// Image paths referenced by the generated stimuli.
    pub fn images(&self) -> BTreeSet<String> {
        self.ctx
            .as_ref()
            .map(|c| c.queue.images().clone())
            .unwrap_or_default()
    }

    /// What the encoder probe reported for the current run.
    pub fn encoder_info(&self) -> Option<&EncoderInfo> {
        self.ctx.as_ref().and_then(|c| c.encoder_info.as_ref())
    }

    /// Generation summary line of the current run, or of the last one that stopped.
    pub fn summary(&self) -> Option<String> {
        self.ctx
            .as_ref()
            .map(|c| c.queue.summary())
            .or_else(|| self.last_summary.clone())
    }

    /// Begin a run. Invalid configuration is rejected before any state change.
    #[tracing::instrument(skip_all, fields(program = %config.program_name, seed = config.seed))]
    pub fn start(&mut self, config: &RunConfig, source: &str) -> EyeCandyResult<()> {
        config.validate()?;
        if self.state.is_active() {
            return Err(EyeCandyError::configuration(format!(
                "a run is already in progress ({:?})",
                self.state
            )));
        }
        self.reset();

        self.state = RunState::Compiling;
        match self.compile(config, source) {
            Ok(ctx) => {
                self.ctx = Some(ctx);
                self.state = RunState::Generating;
                self.notifier
                    .on_log(&format!("compiled program \"{}\"", config.program_name));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn compile(&self, config: &RunConfig, source: &str) -> EyeCandyResult<RunContext> {
        let canvas = config.canvas()?;
        let layout = OutputLayout::new(&config.output_root, config.output_name.clone());
        let mut engine = ProgramEngine::compile(self.host.as_ref(), source, config.seed, canvas)?;
        engine.initialize()?;

        let mut queue = StimulusQueue::new(config.limit_seconds);
        if config.save_stimuli {
            layout.write_program(source)?;
            queue = queue.with_stim_log(layout.stim_writer()?);
        }
        Ok(RunContext {
            config: config.clone(),
            layout,
            engine,
            queue,
            plan: None,
            coordinator: None,
            encoder_info: None,
        })
    }

    /// Run one generation slice. Once generation finishes this moves on to the encoder checks,
    /// or completes a dry run.
    pub fn step_generation(&mut self) -> EyeCandyResult<RunState> {
        if self.state != RunState::Generating {
            return Ok(self.state);
        }
        let Some(ctx) = self.ctx.as_mut() else {
            return Err(self.fail(EyeCandyError::configuration("no run context")));
        };
        let slice = ctx.config.generation_slice;
        let status = match ctx.queue.generate_slice(&mut ctx.engine, &slice) {
            Ok((status, _)) => status,
            Err(e) => return Err(self.fail(e)),
        };
        if !status.is_finished() {
            return Ok(self.state);
        }
        if let Err(e) = self.finish_generation(status) {
            return Err(self.fail(e));
        }
        Ok(self.state)
    }

    fn finish_generation(&mut self, status: GenerationStatus) -> EyeCandyResult<()> {
        let Some(ctx) = self.ctx.as_mut() else {
            return Err(EyeCandyError::configuration("no run context"));
        };
        let summary = ctx.queue.summary();
        self.notifier.on_log(&summary);
        if status == GenerationStatus::Capped {
            self.notifier.on_log(&format!(
                "stopped generating at the {} s limit",
                ctx.config.limit_seconds
            ));
        }

        let dry = ctx.config.compile_only;
        let plan = RunPlan::new(
            ctx.config.canvas()?,
            ctx.config.fps()?,
            ctx.queue.total_duration_secs(),
            ctx.queue.generated(),
            (!dry).then(|| ctx.layout.video()),
        );
        let info = RunInfo::new(
            ctx.config.program_name.clone(),
            ctx.engine.metadata().clone(),
            ctx.config.seed,
            &plan,
            summary,
        );
        let save = ctx.config.save_stimuli;
        let layout = ctx.layout.clone();
        ctx.plan = Some(plan.clone());

        if dry || plan.expected_frame_count == 0 {
            if !dry {
                self.notifier
                    .on_log("program yielded no frames to present; skipping encoding");
            }
            if save {
                layout.write_info(&info)?;
            }
            self.finish(
                RunState::Complete,
                RunOutcome::DryRunCompleted {
                    stimuli: plan.stimulus_count,
                    duration_secs: plan.total_duration_secs,
                },
            );
            return Ok(());
        }

        self.state = RunState::CheckingEncoder;
        let encoder_info = self.encoder.probe()?;
        tracing::info!(encoder = %encoder_info.name, version = %encoder_info.version, "encoder available");
        if let Some(out) = &plan.output_target {
            self.open_encoder(EncoderConfig::new(out.clone(), plan.canvas, plan.fps))?;
        }
        if save {
            layout.write_info(&info.with_encoder(encoder_info.clone()))?;
        }

        if let Some(ctx) = self.ctx.as_mut() {
            ctx.encoder_info = Some(encoder_info);
            ctx.coordinator = Some(FrameCoordinator::new(plan.canvas, plan.expected_frame_count));
        }
        self.state = RunState::Encoding;
        self.notifier.on_progress(0, plan.expected_frame_count);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(out = %cfg.out_path.display()))]
    fn open_encoder(&mut self, cfg: EncoderConfig) -> EyeCandyResult<()> {
        self.encoder.open(&cfg)?;
        self.encoder_open = true;
        Ok(())
    }

    /// Next batch of stimuli for the presenter. Empty once the queue is drained.
    pub fn take_stimulus_batch(&mut self) -> Vec<StimulusSpec> {
        if self.state != RunState::Encoding {
            return Vec::new();
        }
        match self.ctx.as_mut() {
            Some(ctx) => {
                let n = ctx.config.batch_size;
                ctx.queue.take_batch(n)
            }
            None => Vec::new(),
        }
    }

    /// Accept one produced frame. Outside capture the frame is ignored.
    pub fn on_frame(&mut self, frame: FrameBuffer) -> EyeCandyResult<FrameDisposition> {
        if self.state != RunState::Encoding {
            return Ok(FrameDisposition::Ignored);
        }
        let Some(coordinator) = self.ctx.as_mut().and_then(|c| c.coordinator.as_mut()) else {
            return Ok(FrameDisposition::Ignored);
        };
        match coordinator.on_frame(self.encoder.as_mut(), frame) {
            Ok(d) => Ok(d),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Mark producer frame `index` as the first frame showing a stimulus.
    pub fn signal_first_live_frame(&mut self, index: u64) -> EyeCandyResult<usize> {
        if self.state != RunState::Encoding {
            return Ok(0);
        }
        let Some(coordinator) = self.ctx.as_mut().and_then(|c| c.coordinator.as_mut()) else {
            return Ok(0);
        };
        match coordinator.signal_first_live_frame(self.encoder.as_mut(), index) {
            Ok(n) => {
                self.notifier
                    .on_log(&format!("first stimulus frame at {index}"));
                Ok(n)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Collect encoder completions, report progress, and finish the run on completion.
    pub fn poll_completions(&mut self) -> EyeCandyResult<PollControl> {
        if self.state != RunState::Encoding {
            return Ok(PollControl::Stop);
        }
        let Some(coordinator) = self.ctx.as_mut().and_then(|c| c.coordinator.as_mut()) else {
            return Ok(PollControl::Stop);
        };
        let report = match coordinator.poll(self.encoder.as_mut()) {
            Ok(r) => r,
            Err(e) => return Err(self.fail(e)),
        };
        self.notifier
            .on_progress(report.progress.frames_done, report.progress.frames_total);
        if !report.completed {
            return Ok(PollControl::Continue);
        }

        self.encoder_open = false;
        if let Err(e) = self.encoder.close() {
            return Err(self.fail(e));
        }
        let output = self
            .plan()
            .and_then(|p| p.output_target.clone())
            .unwrap_or_default();
        self.notifier
            .on_log(&format!("wrote {}", output.display()));
        self.finish(
            RunState::Complete,
            RunOutcome::Completed {
                frames: report.progress.frames_total,
                output,
            },
        );
        Ok(PollControl::Stop)
    }

    /// Fail the active run with an error raised outside the controller, such as by the
    /// renderer. Returns the error for propagation.
    pub fn report_failure(&mut self, err: EyeCandyError) -> EyeCandyError {
        if self.state.is_active() {
            return self.fail(err);
        }
        err
    }

    /// Stop the run from any state. Open encoder output is aborted and all run state dropped.
    pub fn cancel(&mut self) {
        if !self.state.is_active() {
            tracing::debug!(state = ?self.state, "cancel ignored");
            return;
        }
        self.finish(RunState::Cancelled, RunOutcome::Cancelled);
    }

    /// Return to `Idle`, dropping whatever the last run left behind.
    pub fn reset(&mut self) {
        self.release();
        self.last_plan = None;
        self.last_summary = None;
        self.outcome = None;
        self.state = RunState::Idle;
    }

    fn release(&mut self) {
        if self.encoder_open {
            self.encoder.abort();
            self.encoder_open = false;
        }
        if let Some(mut ctx) = self.ctx.take() {
            if let Some(c) = ctx.coordinator.as_mut() {
                c.clear();
            }
            self.last_plan = ctx.plan.take();
            self.last_summary = Some(ctx.queue.summary());
        }
    }

    /// Stop the run: the session, queue and pending frames are dropped before the host hears
    /// about it.
    fn finish(&mut self, state: RunState, outcome: RunOutcome) {
        self.release();
        self.state = state;
        self.notifier.on_run_stopped(&outcome);
        self.outcome = Some(outcome);
    }

    fn fail(&mut self, err: EyeCandyError) -> EyeCandyError {
        if let EyeCandyError::Program(pe) = &err {
            self.notifier.on_log(&pe.report());
        }
        tracing::warn!(kind = err.kind_label(), error = %err, state = ?self.state, "run failed");
        self.finish(
            RunState::Failed,
            RunOutcome::Failed {
                kind: err.kind_label(),
                message: err.to_string(),
            },
        );
        err
    }
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("state", &self.state)
            .field("encoder_open", &self.encoder_open)
            .field("plan", &self.plan())
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/run.rs"]
mod tests;
