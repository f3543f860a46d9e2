//! Read-only wrapper: lists and verifies for real, never writes.

use crate::error::Result;
use crate::model::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::TaskSource;

pub struct DryRunSource {
    inner: Arc<dyn TaskSource>,
}

impl DryRunSource {
    pub fn new(inner: Arc<dyn TaskSource>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TaskSource for DryRunSource {
    async fn list_in_status(&self, status: &str) -> Result<Vec<TaskId>> {
        self.inner.list_in_status(status).await
    }

    async fn get_status(&self, id: &TaskId) -> Result<String> {
        self.inner.get_status(id).await
    }

    async fn set_status(&self, id: &TaskId, status: &str) -> Result<()> {
        info!(task_id = %id, status, "dry run: status update suppressed");
        Ok(())
    }
}
