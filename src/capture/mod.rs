//! Frame capture: pre-roll handling, encode submission, completion tracking, and polling.

pub(crate) mod coordinator;
pub(crate) mod poller;
pub(crate) mod tracker;
