//! Activity log retention background job.

use std::sync::Arc;

use chrono::Utc;
use persistence::stores::PgEventLog;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Deletes activity log records older than the retention period.
pub struct CleanupLogsJob {
    logs: Arc<PgEventLog>,
    retention_days: u32,
}

impl CleanupLogsJob {
    pub fn new(logs: Arc<PgEventLog>, retention_days: u32) -> Self {
        Self {
            logs,
            retention_days,
        }
    }
}

/// Oldest timestamp (epoch ms) that survives retention at `now_ms`.
pub fn retention_cutoff(now_ms: i64, retention_days: u32) -> i64 {
    now_ms.saturating_sub(i64::from(retention_days).saturating_mul(MILLIS_PER_DAY))
}

#[async_trait::async_trait]
impl Job for CleanupLogsJob {
    fn name(&self) -> &'static str {
        "cleanup_logs"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let cutoff = retention_cutoff(Utc::now().timestamp_millis(), self.retention_days);
        let deleted = self
            .logs
            .delete_older_than(cutoff)
            .await
            .map_err(|e| format!("Failed to delete old log records: {}", e))?;

        info!(
            deleted,
            retention_days = self.retention_days,
            "Cleaned up old log records"
        );
        Ok(())
    }
}
