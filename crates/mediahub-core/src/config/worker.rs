//! Scheduled job configuration.

use serde::{Deserialize, Serialize};

/// Periodic sync/backfill scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the scheduler is started by the daemon.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for the full sync pass.
    #[serde(default = "default_sync_cron")]
    pub sync_cron: String,
    /// Cron expression (with seconds) for the backfill pass.
    #[serde(default = "default_backfill_cron")]
    pub backfill_cron: String,
    /// Run a sync followed by a backfill once at startup.
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_cron: default_sync_cron(),
            backfill_cron: default_backfill_cron(),
            run_on_startup: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sync_cron() -> String {
    "0 */15 * * * *".to_string()
}

fn default_backfill_cron() -> String {
    "0 5 * * * *".to_string()
}
