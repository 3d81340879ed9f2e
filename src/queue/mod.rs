//! Stimulus queue, generation slicing, and the run's frame plan.

pub(crate) mod plan;
pub(crate) mod stimulus_queue;

#[cfg(test)]
#[path = "../../tests/unit/queue/queue.rs"]
mod tests;
