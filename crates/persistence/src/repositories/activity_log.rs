//! Activity log repository for database operations.

use sqlx::PgPool;

use crate::entities::ActivityLogEntity;
use crate::metrics::QueryTimer;
use domain::models::NewLogRecord;

/// Repository for the append-only activity history.
#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    /// Creates a new ActivityLogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one record.
    pub async fn insert(&self, record: &NewLogRecord) -> Result<ActivityLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_activity_log");
        let result = sqlx::query_as::<_, ActivityLogEntity>(
            r#"
            INSERT INTO activity_logs (target_name, event_type, timestamp_ms, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, target_name, event_type, timestamp_ms, message
            "#,
        )
        .bind(&record.target_name)
        .bind(record.event_type.as_str())
        .bind(record.timestamp)
        .bind(&record.message)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Most recent records first.
    pub async fn list(&self, limit: i64) -> Result<Vec<ActivityLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_activity_logs");
        let result = sqlx::query_as::<_, ActivityLogEntity>(
            r#"
            SELECT id, target_name, event_type, timestamp_ms, message
            FROM activity_logs
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_activity_logs");
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM activity_logs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count.0)
    }

    /// Delete the whole history.
    /// Returns the number of rows deleted.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_activity_logs");
        let result = sqlx::query(
            r#"
            DELETE FROM activity_logs
            "#,
        )
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Delete records older than `cutoff_ms` (epoch millis).
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_old_activity_logs");
        let result = sqlx::query(
            r#"
            DELETE FROM activity_logs WHERE timestamp_ms < $1
            "#,
        )
        .bind(cutoff_ms)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
