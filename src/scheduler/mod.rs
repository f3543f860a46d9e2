//! Deferred-acknowledgment scheduler: pending table, deferral draws and the
//! polling loop that discovers, arms and fires tasks.

pub mod deferred;
pub mod delay;
pub mod pending;

pub use deferred::{CycleReport, DeferredScheduler, FireOutcome, SchedulerConfig, ShutdownHandle};
pub use delay::DelayRange;
pub use pending::{PendingEntry, PendingTable};
