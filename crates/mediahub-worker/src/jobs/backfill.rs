//! Derived-asset backfill job handler.

use async_trait::async_trait;
use serde_json::Value;

use mediahub_service::SyncOrchestrator;

use crate::executor::{JobExecutionError, JobHandler};
use crate::jobs::{BACKFILL_JOB, classify};

/// Derives missing thumbnails and subtitles for cataloged videos
#[derive(Debug, Clone)]
pub struct BackfillJobHandler {
    orchestrator: SyncOrchestrator,
}

impl BackfillJobHandler {
    /// Create a new backfill job handler
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl JobHandler for BackfillJobHandler {
    fn job_type(&self) -> &str {
        BACKFILL_JOB
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        let report = self.orchestrator.backfill().await.map_err(classify)?;
        serde_json::to_value(report)
            .map_err(|e| JobExecutionError::Internal(mediahub_core::AppError::from(e)))
    }
}
