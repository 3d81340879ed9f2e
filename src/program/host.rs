use crate::foundation::core::Canvas;
use crate::foundation::error::ProgramError;
use crate::stimulus::spec::StimulusSpec;
use std::collections::BTreeMap;

/// Program-level metadata (`name`, `version`, free-form extras).
pub type ProgramMetadata = BTreeMap<String, serde_json::Value>;

/// One step of the pull protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramNext {
    /// `true` once the program has no more stimuli. Permanent.
    pub done: bool,
    /// 0-based index of the yielded stimulus (equal to the number yielded before it).
    pub stimulus_index: u64,
    /// The yielded stimulus; `None` exactly when `done`.
    pub value: Option<StimulusSpec>,
}

impl ProgramNext {
    /// A yielded stimulus.
    pub fn yielded(stimulus_index: u64, value: StimulusSpec) -> Self {
        Self {
            done: false,
            stimulus_index,
            value: Some(value),
        }
    }

    /// End of sequence.
    pub fn done(stimulus_index: u64) -> Self {
        Self {
            done: true,
            stimulus_index,
            value: None,
        }
    }
}

/// A compiled program bound to one seed and canvas.
///
/// Single-threaded and cooperative: each `next` call runs the program up to its next yield.
pub trait ProgramSession: Send {
    /// Metadata declared by the program.
    fn metadata(&self) -> &ProgramMetadata;
    /// Prepare the lazy sequence. Called exactly once, before any `next`.
    fn initialize(&mut self) -> Result<(), ProgramError>;
    /// Produce the next stimulus or signal completion.
    fn next(&mut self) -> Result<ProgramNext, ProgramError>;
}

/// Execution environment that turns program text into a [`ProgramSession`].
///
/// The isolation mechanism is the host's concern; callers only see compile/initialize/next.
pub trait ProgramHost: Send + Sync {
    /// Compile `source` with the run's seed and target canvas.
    fn compile(
        &self,
        source: &str,
        seed: u32,
        canvas: Canvas,
    ) -> Result<Box<dyn ProgramSession>, ProgramError>;
}
