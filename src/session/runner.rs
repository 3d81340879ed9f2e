use crate::capture::coordinator::FrameDisposition;
use crate::capture::poller::{CompletionPoller, PollControl, PollGuard};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::images::ImageCache;
use crate::render::presenter::{Presenter, StimulusSource};
use crate::render::surface::HeadlessSurface;
use crate::session::config::RunConfig;
use crate::session::notify::RunOutcome;
use crate::session::run::{RunController, RunState};
use crate::stimulus::spec::StimulusSpec;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

fn lock(c: &Mutex<RunController>) -> MutexGuard<'_, RunController> {
    c.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds the presenter from the controller's queue.
struct ControllerSource<'a>(&'a Mutex<RunController>);

impl StimulusSource for ControllerSource<'_> {
    fn next_batch(&mut self) -> EyeCandyResult<Vec<StimulusSpec>> {
        Ok(lock(self.0).take_stimulus_batch())
    }
}

/// Drives a [`RunController`] end to end on the calling thread.
///
/// Generation runs in slices, releasing the controller between them. During capture a
/// [`CompletionPoller`] thread collects encoder completions while this thread ticks a
/// [`HeadlessSurface`]. [`Runner::cancel`] may be called from any other thread.
#[derive(Debug)]
pub struct Runner {
    controller: Arc<Mutex<RunController>>,
    guard: PollGuard,
}

impl Runner {
    /// Take ownership of `controller`.
    pub fn new(controller: RunController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            guard: PollGuard::default(),
        }
    }

    /// Shared handle to the controller, for inspection from other threads.
    pub fn controller(&self) -> Arc<Mutex<RunController>> {
        Arc::clone(&self.controller)
    }

    /// Current controller state.
    pub fn state(&self) -> RunState {
        lock(&self.controller).state()
    }

    /// Cancel the run. Safe to call from any thread and any state.
    pub fn cancel(&self) {
        lock(&self.controller).cancel();
    }

    /// Run `source` to completion. Relative image paths resolve against `image_root`.
    ///
    /// Failures are returned after the controller has moved to `Failed` and notified its host;
    /// a cancelled run returns `Ok(RunOutcome::Cancelled)`.
    #[tracing::instrument(skip_all, fields(program = %config.program_name))]
    pub fn run(
        &self,
        config: &RunConfig,
        source: &str,
        image_root: &Path,
    ) -> EyeCandyResult<RunOutcome> {
        lock(&self.controller).start(config, source)?;

        let mut slices = 0u64;
        loop {
            let state = lock(&self.controller).step_generation()?;
            slices += 1;
            if state != RunState::Generating {
                break;
            }
        }
        tracing::debug!(slices, "generation finished");

        if self.state() == RunState::Encoding {
            self.capture(config, image_root)?;
        }
        let c = lock(&self.controller);
        Ok(c.outcome().cloned().unwrap_or(RunOutcome::Cancelled))
    }

    fn capture(&self, config: &RunConfig, image_root: &Path) -> EyeCandyResult<()> {
        let canvas = config.canvas()?;
        let fps = config.fps()?;

        let images = lock(&self.controller).images();
        let mut cache = ImageCache::new(image_root);
        if let Err(e) = cache.preload(&images) {
            return Err(lock(&self.controller).report_failure(e));
        }

        let presenter = Presenter::new(canvas, fps, config.seed, config.reload_threshold)
            .with_images(cache);
        let mut surface = HeadlessSurface::new(presenter, canvas, config.startup_frames)
            .with_padding(config.preroll_padding);

        let shared = Arc::clone(&self.controller);
        let mut poller = CompletionPoller::spawn(config.poll_interval(), self.guard.clone(), move || {
            match lock(&shared).poll_completions() {
                Ok(control) => control,
                Err(e) => {
                    tracing::debug!(error = %e, "poll stopped by failure");
                    PollControl::Stop
                }
            }
        })?;

        let pool = build_thread_pool(config.render_threads)?;
        let result = pool.install(|| self.tick_loop(&mut surface, config));
        poller.cancel();

        if let Err(e) = result {
            return Err(lock(&self.controller).report_failure(e));
        }
        tracing::info!(
            produced = surface.produced(),
            drawn = surface.presenter().frames_drawn(),
            "capture finished"
        );
        Ok(())
    }

    fn tick_loop(&self, surface: &mut HeadlessSurface, config: &RunConfig) -> EyeCandyResult<()> {
        let interval = config.fps()?.tick_interval();
        let mut next_tick = Instant::now();
        let mut draining = false;

        while self.state() == RunState::Encoding {
            if draining {
                std::thread::sleep(config.poll_interval());
                if let Some(_pass) = self.guard.try_enter() {
                    // Completion is reported through the controller state.
                    let _ = lock(&self.controller).poll_completions();
                }
                continue;
            }

            let tick = surface.tick(&mut ControllerSource(&self.controller))?;
            let mut c = lock(&self.controller);
            if let Some(first) = tick.first_live {
                c.signal_first_live_frame(first)?;
            }
            let disposition = c.on_frame(tick.frame)?;
            drop(c);
            if disposition == FrameDisposition::DiscardedPastDeadline {
                tracing::debug!(index = tick.index, "frame deadline reached; draining encoder");
                draining = true;
            }

            if config.realtime {
                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    std::thread::sleep(next_tick - now);
                }
            }
        }
        Ok(())
    }
}

fn build_thread_pool(threads: Option<usize>) -> EyeCandyResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(EyeCandyError::configuration(
            "render_threads must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| EyeCandyError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}
