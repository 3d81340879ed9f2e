//! Stimulus descriptors yielded by programs and consumed by the renderer.

pub(crate) mod spec;
