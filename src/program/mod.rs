//! Stimulus programs: the seeded random source, the host/session seam, and the pull cursor.

pub(crate) mod declarative;
pub(crate) mod engine;
pub(crate) mod host;
pub(crate) mod random;
