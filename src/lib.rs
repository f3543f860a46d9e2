//! # deferack
//!
//! Watches a ClickUp list for tasks entering a status, waits a randomized
//! interval per task, re-checks that the task is still waiting, and then
//! moves it to a final "acknowledged" status.
//!
//! The pending table is in-memory only; restarting the process forgets all
//! armed tasks and rediscovers whatever is still in the target status.

pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod source;
pub mod telemetry;
