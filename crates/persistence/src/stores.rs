//! PostgreSQL-backed [`TargetStore`] and [`EventLogSink`].
//!
//! Both keep a `watch` snapshot that is republished after every mutation made
//! through them. Changes written to the database by other processes become
//! visible on the next `refresh`.

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repositories::{ActivityLogRepository, TargetRepository};
use domain::models::{LogRecord, NewLogRecord, Target, UpdateTargetRequest};
use domain::services::event_log::sort_newest_first;
use domain::services::{EventLogSink, StoreError, TargetStore};
use sqlx::PgPool;

/// Number of recent log records kept in the published snapshot.
pub const DEFAULT_LOG_WINDOW: usize = 500;

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            StoreError::Invalid(db.message().to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Target store over the `targets` table.
pub struct PgTargetStore {
    repo: TargetRepository,
    active_tx: watch::Sender<Vec<Target>>,
}

impl PgTargetStore {
    /// Creates the store and loads the initial active set.
    pub async fn new(pool: PgPool) -> Result<Self, StoreError> {
        let (active_tx, _) = watch::channel(Vec::new());
        let store = Self {
            repo: TargetRepository::new(pool),
            active_tx,
        };
        store.refresh().await?;
        Ok(store)
    }

    /// Reloads the active set from the database and notifies subscribers if it changed.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let active: Vec<Target> = self
            .repo
            .list(false)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Target::from)
            .collect();

        let changed = self.active_tx.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
        if changed {
            debug!(
                active_targets = self.active_tx.borrow().len(),
                "Active targets republished"
            );
        }
        Ok(())
    }

    /// Refresh after a successful write; the write itself already happened.
    async fn republish(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Failed to republish active targets");
        }
    }

    pub async fn create(&self, target: &Target) -> Result<Target, StoreError> {
        let created = self.repo.create(target).await.map_err(store_error)?;
        self.republish().await;
        Ok(created.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Target, StoreError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(store_error)?
            .map(Target::from)
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Target>, StoreError> {
        Ok(self
            .repo
            .list(include_inactive)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Target::from)
            .collect())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        self.repo.count().await.map_err(store_error)
    }

    pub async fn update(&self, id: Uuid, request: &UpdateTargetRequest) -> Result<Target, StoreError> {
        let updated = self
            .repo
            .update(
                id,
                request.name.as_deref(),
                request.latitude,
                request.longitude,
                request.radius_meters,
                request.is_active,
            )
            .await
            .map_err(store_error)?
            .ok_or(StoreError::NotFound(id))?;
        self.republish().await;
        Ok(updated.into())
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Target, StoreError> {
        let updated = self
            .repo
            .set_active(id, active)
            .await
            .map_err(store_error)?
            .ok_or(StoreError::NotFound(id))?;
        self.republish().await;
        Ok(updated.into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let deleted = self.repo.delete(id).await.map_err(store_error)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        self.republish().await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TargetStore for PgTargetStore {
    fn subscribe_active_targets(&self) -> watch::Receiver<Vec<Target>> {
        self.active_tx.subscribe()
    }

    async fn update_last_triggered(
        &self,
        target_id: Uuid,
        timestamp: i64,
    ) -> Result<(), StoreError> {
        let updated = self
            .repo
            .update_last_triggered(target_id, timestamp)
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(StoreError::NotFound(target_id));
        }
        self.republish().await;
        Ok(())
    }
}

/// Event log over the `activity_logs` table.
///
/// Subscribers see the most recent `window` records; older history stays
/// reachable through [`EventLogSink::list`].
pub struct PgEventLog {
    repo: ActivityLogRepository,
    records_tx: watch::Sender<Vec<LogRecord>>,
    window: usize,
}

impl PgEventLog {
    pub async fn new(pool: PgPool, window: usize) -> Result<Self, StoreError> {
        let (records_tx, _) = watch::channel(Vec::new());
        let log = Self {
            repo: ActivityLogRepository::new(pool),
            records_tx,
            window: window.max(1),
        };
        log.reload().await?;
        Ok(log)
    }

    /// Reloads the published window from the database.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let records = self.fetch(self.window).await?;
        self.records_tx.send_replace(records);
        Ok(())
    }

    /// Deletes records older than `cutoff_ms`, returning how many were removed.
    pub async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64, StoreError> {
        let deleted = self
            .repo
            .delete_older_than(cutoff_ms)
            .await
            .map_err(store_error)?;
        if deleted > 0 {
            self.reload().await?;
        }
        Ok(deleted)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        self.repo.count().await.map_err(store_error)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(self
            .repo
            .list(limit)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(LogRecord::from)
            .collect())
    }
}

#[async_trait::async_trait]
impl EventLogSink for PgEventLog {
    async fn append(&self, record: NewLogRecord) -> Result<LogRecord, StoreError> {
        let stored: LogRecord = self
            .repo
            .insert(&record)
            .await
            .map_err(store_error)?
            .into();

        let window = self.window;
        self.records_tx.send_modify(|records| {
            records.push(stored.clone());
            sort_newest_first(records);
            records.truncate(window);
        });

        Ok(stored)
    }

    fn subscribe_all(&self) -> watch::Receiver<Vec<LogRecord>> {
        self.records_tx.subscribe()
    }

    async fn list(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        self.fetch(limit).await
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let deleted = self.repo.delete_all().await.map_err(store_error)?;
        self.records_tx.send_replace(Vec::new());
        Ok(deleted)
    }
}
