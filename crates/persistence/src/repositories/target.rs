//! Target repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TargetEntity;
use crate::metrics::QueryTimer;
use domain::models::Target;

/// Repository for target-related database operations.
#[derive(Clone)]
pub struct TargetRepository {
    pool: PgPool,
}

impl TargetRepository {
    /// Creates a new TargetRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new target.
    pub async fn create(&self, target: &Target) -> Result<TargetEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_target");
        let result = sqlx::query_as::<_, TargetEntity>(
            r#"
            INSERT INTO targets (id, name, latitude, longitude, radius_meters,
                                 is_active, last_triggered, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(target.id)
        .bind(&target.name)
        .bind(target.latitude)
        .bind(target.longitude)
        .bind(target.radius_meters)
        .bind(target.is_active)
        .bind(target.last_triggered)
        .bind(target.created_at)
        .bind(target.updated_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find target by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TargetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_target_by_id");
        let result = sqlx::query_as::<_, TargetEntity>(
            r#"
            SELECT * FROM targets WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List targets in creation order.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<TargetEntity>, sqlx::Error> {
        let timer = QueryTimer::new(if include_inactive {
            "list_targets"
        } else {
            "list_active_targets"
        });
        let result = sqlx::query_as::<_, TargetEntity>(
            r#"
            SELECT * FROM targets
            WHERE is_active OR $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count all stored targets.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_targets");
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM targets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count.0)
    }

    /// Update a target (partial update).
    /// Only provided fields are updated; None values are preserved.
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_meters: Option<i32>,
        is_active: Option<bool>,
    ) -> Result<Option<TargetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_target");
        let result = sqlx::query_as::<_, TargetEntity>(
            r#"
            UPDATE targets SET
                name = COALESCE($2, name),
                latitude = COALESCE($3, latitude),
                longitude = COALESCE($4, longitude),
                radius_meters = COALESCE($5, radius_meters),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .bind(radius_meters)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Activate or deactivate a target.
    pub async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<TargetEntity>, sqlx::Error> {
        self.update(id, None, None, None, None, Some(is_active)).await
    }

    /// Record an alert time. Never moves `last_triggered` backwards.
    /// Returns the number of rows updated (0 or 1).
    pub async fn update_last_triggered(&self, id: Uuid, timestamp: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("update_target_last_triggered");
        let result = sqlx::query(
            r#"
            UPDATE targets
            SET last_triggered = GREATEST(last_triggered, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Delete a target.
    /// Returns the number of rows deleted (0 or 1).
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_target");
        let result = sqlx::query(
            r#"
            DELETE FROM targets WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
