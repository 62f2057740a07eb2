//! Activity log entity (database row mapping).

use sqlx::FromRow;

use domain::models::{LogEventType, LogRecord};

/// Database row mapping for the activity_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogEntity {
    pub id: i64,
    pub target_name: String,
    pub event_type: String,
    pub timestamp_ms: i64,
    pub message: String,
}

impl From<ActivityLogEntity> for LogRecord {
    fn from(entity: ActivityLogEntity) -> Self {
        Self {
            id: entity.id,
            target_name: entity.target_name,
            // The table constraint only admits known values.
            event_type: LogEventType::parse(&entity.event_type).unwrap_or(LogEventType::System),
            timestamp: entity.timestamp_ms,
            message: entity.message,
        }
    }
}
