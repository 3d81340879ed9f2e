//! Video encoders.
//!
//! Encoders accept frames without blocking and report completion by id.

pub(crate) mod encoder;
pub(crate) mod ffmpeg;
pub(crate) mod memory;
