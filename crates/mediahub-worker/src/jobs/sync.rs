//! Full catalog sync job handler.

use async_trait::async_trait;
use serde_json::Value;

use mediahub_service::SyncOrchestrator;

use crate::executor::{JobExecutionError, JobHandler};
use crate::jobs::{SYNC_JOB, classify};

/// Mirrors the blob store listing into the catalog
#[derive(Debug, Clone)]
pub struct SyncJobHandler {
    orchestrator: SyncOrchestrator,
}

impl SyncJobHandler {
    /// Create a new sync job handler
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl JobHandler for SyncJobHandler {
    fn job_type(&self) -> &str {
        SYNC_JOB
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        let report = self.orchestrator.full_sync().await.map_err(classify)?;
        serde_json::to_value(report)
            .map_err(|e| JobExecutionError::Internal(mediahub_core::AppError::from(e)))
    }
}
