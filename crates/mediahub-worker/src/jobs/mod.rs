//! Built-in job handler implementations

pub mod backfill;
pub mod sync;

pub use backfill::BackfillJobHandler;
pub use sync::SyncJobHandler;

use mediahub_core::error::{AppError, ErrorKind};

use crate::executor::JobExecutionError;

/// Job type of the full catalog sync.
pub const SYNC_JOB: &str = "catalog_sync";
/// Job type of the derived-asset backfill.
pub const BACKFILL_JOB: &str = "asset_backfill";

/// Sort a pass failure into retry classes: upstream and persistence
/// failures clear up on their own, bad configuration does not.
pub(crate) fn classify(err: AppError) -> JobExecutionError {
    match err.kind {
        ErrorKind::Database | ErrorKind::Storage | ErrorKind::ExternalService => {
            JobExecutionError::Transient(err.to_string())
        }
        ErrorKind::Configuration | ErrorKind::Validation => {
            JobExecutionError::Permanent(err.to_string())
        }
        _ => JobExecutionError::Internal(err),
    }
}
