use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Returned by a poll tick to keep or stop the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollControl {
    /// Keep polling.
    Continue,
    /// End the loop.
    Stop,
}

/// Reentrancy flag shared by everything that may run a completion poll.
#[derive(Clone, Debug, Default)]
pub struct PollGuard(Arc<AtomicBool>);

/// Held while a poll runs; clears the flag on drop.
#[derive(Debug)]
pub struct PollPass<'a>(&'a AtomicBool);

impl PollGuard {
    /// Enter the poll, or `None` if another poll is still running.
    pub fn try_enter(&self) -> Option<PollPass<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PollPass(&self.0))
    }

    /// `true` while a poll holds the guard.
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for PollPass<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Recurring completion poll on its own thread.
///
/// Ticks never overlap: a tick that finds the [`PollGuard`] busy is skipped. The loop ends when
/// a tick returns [`PollControl::Stop`] or on [`CompletionPoller::cancel`]; cancelling a loop that
/// already stopped itself is a no-op.
#[derive(Debug)]
pub struct CompletionPoller {
    cancel_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
}

impl CompletionPoller {
    /// Start a thread calling `tick` every `interval` under `guard`.
    pub fn spawn<F>(interval: Duration, guard: PollGuard, mut tick: F) -> EyeCandyResult<Self>
    where
        F: FnMut() -> PollControl + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_thread = Arc::clone(&stopped);
        let handle = std::thread::Builder::new()
            .name("eyecandy-completion-poll".to_owned())
            .spawn(move || {
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(_pass) = guard.try_enter() else {
                        tracing::trace!("previous poll still running; skipping tick");
                        continue;
                    };
                    if tick() == PollControl::Stop {
                        break;
                    }
                }
                stopped_thread.store(true, Ordering::Release);
            })
            .map_err(|e| EyeCandyError::Other(anyhow::anyhow!("failed to spawn poll thread: {e}")))?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
            stopped,
        })
    }

    /// `true` until the loop has exited.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for it. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("completion poll thread panicked");
            }
        }
    }
}

impl Drop for CompletionPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/poller.rs"]
mod tests;
