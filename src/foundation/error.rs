/// Convenience result type used across eyecandy.
pub type EyeCandyResult<T> = Result<T, EyeCandyError>;

/// Structured failure raised by a stimulus program.
///
/// Mirrors what a script host reports for a thrown error: an error class name, the message, and a
/// stack-like trace locating the failing construct.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct ProgramError {
    /// Error class (`SyntaxError`, `TypeError`, `ReferenceError`, `RangeError`, ...).
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Stack-like trace (for the declarative host, a JSON path into the program).
    pub stack: String,
}

impl ProgramError {
    /// Build a program error from its three parts.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: stack.into(),
        }
    }

    /// Multi-line report in the layout shown to the operator.
    pub fn report(&self) -> String {
        format!(
            "Error:\n  Name: {}\n  Message: {}\n  Stack: {}\n",
            self.name, self.message, self.stack
        )
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum EyeCandyError {
    /// Invalid run parameters, rejected before any state transition.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed or throwing stimulus program.
    #[error("program error: {0}")]
    Program(#[from] ProgramError),

    /// External encoder missing, wrong version, or unsupported output.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Failure while opening, feeding, or closing the encoder.
    #[error("encoder io error: {0}")]
    EncoderIo(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EyeCandyError {
    /// Build a [`EyeCandyError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`EyeCandyError::EncoderUnavailable`] value.
    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable(msg.into())
    }

    /// Build a [`EyeCandyError::EncoderIo`] value.
    pub fn encoder_io(msg: impl Into<String>) -> Self {
        Self::EncoderIo(msg.into())
    }

    /// Build a [`EyeCandyError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures originating in the stimulus program.
    pub fn is_program(&self) -> bool {
        matches!(self, Self::Program(_))
    }

    /// Short label for the error class, used in outcome reports.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Program(_) => "program",
            Self::EncoderUnavailable(_) => "encoder-unavailable",
            Self::EncoderIo(_) => "encoder-io",
            Self::Serde(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for EyeCandyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
