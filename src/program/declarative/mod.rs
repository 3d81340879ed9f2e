//! Deterministic JSON program host.
//!
//! A program is a tree of `stimulus`, `group`, `repeat`, `for`, and `shuffle` nodes. Stimulus
//! templates may embed `$`-expressions that draw from the run's random source when the
//! stimulus is yielded.

pub(crate) mod cursor;
pub(crate) mod expr;
pub(crate) mod model;

use crate::foundation::core::Canvas;
use crate::foundation::error::ProgramError;
use crate::program::host::{ProgramHost, ProgramSession};

pub use cursor::DeclarativeSession;
pub use model::ProgramDoc;

/// [`ProgramHost`] for declarative JSON programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeHost;

impl ProgramHost for DeclarativeHost {
    fn compile(
        &self,
        source: &str,
        seed: u32,
        canvas: Canvas,
    ) -> Result<Box<dyn ProgramSession>, ProgramError> {
        let doc = ProgramDoc::parse(source)?;
        tracing::debug!(nodes = doc.body.len(), seed, "compiled declarative program");
        Ok(Box::new(DeclarativeSession::new(doc, seed, canvas)))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/program/declarative.rs"]
mod tests;
