//! Run lifecycle: configuration, the controller state machine, host notifications, output
//! artifacts and the threaded driver.

pub(crate) mod config;
pub(crate) mod notify;
pub(crate) mod output;
pub(crate) mod run;
pub(crate) mod runner;
