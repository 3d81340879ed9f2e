//! Reference renderer: stimulus draw routines, the per-tick presenter and a headless surface.

pub(crate) mod draw;
pub(crate) mod frame;
pub(crate) mod images;
pub(crate) mod presenter;
pub(crate) mod surface;
