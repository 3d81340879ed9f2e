use crate::foundation::core::Canvas;
use crate::foundation::error::{EyeCandyError, EyeCandyResult, ProgramError};
use crate::program::host::{ProgramHost, ProgramMetadata, ProgramNext, ProgramSession};
use crate::stimulus::spec::StimulusSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Compiled,
    Ready,
    Done,
    Failed,
}

/// Resumable cursor over a program's lazy stimulus sequence.
///
/// Enforces the protocol around a host session: `initialize` exactly once, `next` only after
/// it, `done` is sticky, and the first error poisons the cursor so nothing is yielded after a
/// failure.
pub struct ProgramEngine {
    session: Box<dyn ProgramSession>,
    state: CursorState,
    yielded: u64,
    seed: u32,
}

impl ProgramEngine {
    /// Compile `source` through `host`.
    #[tracing::instrument(skip(host, source), fields(source_len = source.len()))]
    pub fn compile(
        host: &dyn ProgramHost,
        source: &str,
        seed: u32,
        canvas: Canvas,
    ) -> EyeCandyResult<Self> {
        let session = host.compile(source, seed, canvas)?;
        Ok(Self {
            session,
            state: CursorState::Compiled,
            yielded: 0,
            seed,
        })
    }

    /// Seed the session was compiled with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Program metadata.
    pub fn metadata(&self) -> &ProgramMetadata {
        self.session.metadata()
    }

    /// Number of stimuli yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// `true` once the sequence signalled completion.
    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Initialize the sequence. A second call is rejected.
    pub fn initialize(&mut self) -> EyeCandyResult<()> {
        if self.state != CursorState::Compiled {
            return Err(EyeCandyError::configuration(
                "program engine is already initialized",
            ));
        }
        match self.session.initialize() {
            Ok(()) => {
                self.state = CursorState::Ready;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Pull the next step.
    pub fn next_step(&mut self) -> EyeCandyResult<ProgramNext> {
        match self.state {
            CursorState::Compiled => {
                return Err(EyeCandyError::configuration(
                    "program engine must be initialized before next()",
                ));
            }
            CursorState::Failed => {
                return Err(EyeCandyError::configuration(
                    "program engine already failed",
                ));
            }
            CursorState::Done => return Ok(ProgramNext::done(self.yielded)),
            CursorState::Ready => {}
        }

        let step = match self.session.next() {
            Ok(step) => step,
            Err(e) => return Err(self.fail(e)),
        };
        if step.done {
            self.state = CursorState::Done;
            return Ok(ProgramNext::done(self.yielded));
        }
        let Some(value) = step.value else {
            return Err(self.fail(ProgramError::new(
                "TypeError",
                "program response did not contain a stimulus",
                format!("next() #{}", self.yielded),
            )));
        };

        let out = ProgramNext::yielded(self.yielded, value);
        self.yielded += 1;
        Ok(out)
    }

    fn fail(&mut self, e: ProgramError) -> EyeCandyError {
        self.state = CursorState::Failed;
        tracing::warn!(name = %e.name, message = %e.message, stack = %e.stack, "program failed");
        EyeCandyError::Program(e)
    }
}

impl Iterator for ProgramEngine {
    type Item = EyeCandyResult<StimulusSpec>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, CursorState::Done | CursorState::Failed) {
            return None;
        }
        match self.next_step() {
            Ok(step) => step.value.map(Ok),
            Err(e) => Some(Err(e)),
        }
    }
}

impl std::fmt::Debug for ProgramEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramEngine")
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/program/engine.rs"]
mod tests;
