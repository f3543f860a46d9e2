//! Task source: the I/O boundary between the scheduler and the tracker.
//!
//! Implementations are stateless translators. They return raw transport
//! errors; the scheduler decides what each failure means.

pub mod clickup;
pub mod dry_run;

pub use clickup::ClickUpClient;
pub use dry_run::DryRunSource;

use crate::error::Result;
use crate::model::TaskId;
use async_trait::async_trait;

#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Ids of tasks currently in `status`, excluding archived ones.
    async fn list_in_status(&self, status: &str) -> Result<Vec<TaskId>>;

    /// Current status name of a single task.
    async fn get_status(&self, id: &TaskId) -> Result<String>;

    /// Move a single task to `status`.
    async fn set_status(&self, id: &TaskId, status: &str) -> Result<()>;
}
