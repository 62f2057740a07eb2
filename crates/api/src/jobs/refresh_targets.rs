//! Picks up target changes made outside this process.

use std::sync::Arc;

use persistence::stores::PgTargetStore;

use super::scheduler::{Job, JobFrequency};

/// Reloads the active target set from the database so that rows written by
/// other writers reach the monitoring loop.
pub struct RefreshTargetsJob {
    targets: Arc<PgTargetStore>,
    interval_secs: u64,
}

impl RefreshTargetsJob {
    pub fn new(targets: Arc<PgTargetStore>, interval_secs: u64) -> Self {
        Self {
            targets,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for RefreshTargetsJob {
    fn name(&self) -> &'static str {
        "refresh_targets"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        self.targets
            .refresh()
            .await
            .map_err(|e| format!("Failed to refresh targets: {}", e))
    }
}
