//! Target storage seam used by the monitoring loop.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::models::Target;

/// Errors reported by target and event-log stores.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Read/write access to the user's targets as the monitoring loop needs it.
#[async_trait::async_trait]
pub trait TargetStore: Send + Sync {
    /// Live view of the active targets. The receiver always holds the latest
    /// snapshot and is notified whenever the active set changes.
    fn subscribe_active_targets(&self) -> watch::Receiver<Vec<Target>>;

    /// Persists the time of the most recent alert for a target.
    async fn update_last_triggered(&self, target_id: Uuid, timestamp: i64)
        -> Result<(), StoreError>;
}

/// Target store kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryTargetStore {
    targets: RwLock<Vec<Target>>,
    active_tx: watch::Sender<Vec<Target>>,
    failing_writes: AtomicUsize,
}

impl Default for InMemoryTargetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTargetStore {
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(Vec::new());
        Self {
            targets: RwLock::new(Vec::new()),
            active_tx,
            failing_writes: AtomicUsize::new(0),
        }
    }

    /// Creates a store pre-populated with `targets`.
    pub async fn with_targets(targets: Vec<Target>) -> Self {
        let store = Self::new();
        for target in targets {
            store.insert(target).await;
        }
        store
    }

    /// Makes the next `count` calls to `update_last_triggered` fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub async fn insert(&self, target: Target) -> Target {
        let mut targets = self.targets.write().await;
        targets.push(target.clone());
        self.publish(&targets);
        target
    }

    pub async fn get(&self, id: Uuid) -> Option<Target> {
        self.targets.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// All targets in creation order.
    pub async fn list(&self, include_inactive: bool) -> Vec<Target> {
        self.targets
            .read()
            .await
            .iter()
            .filter(|t| include_inactive || t.is_active)
            .cloned()
            .collect()
    }

    /// Replaces the stored target with the same id.
    pub async fn update(&self, target: Target) -> Result<Target, StoreError> {
        self.modify(target.id, |stored| {
            *stored = target.clone();
            stored.updated_at = Utc::now();
        })
        .await
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Target, StoreError> {
        self.modify(id, |stored| {
            stored.is_active = active;
            stored.updated_at = Utc::now();
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut targets = self.targets.write().await;
        let before = targets.len();
        targets.retain(|t| t.id != id);
        if targets.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.publish(&targets);
        Ok(())
    }

    async fn modify<F>(&self, id: Uuid, change: F) -> Result<Target, StoreError>
    where
        F: FnOnce(&mut Target),
    {
        let mut targets = self.targets.write().await;
        let stored = targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        change(stored);
        let updated = stored.clone();
        self.publish(&targets);
        Ok(updated)
    }

    fn publish(&self, targets: &[Target]) {
        let active: Vec<Target> = targets.iter().filter(|t| t.is_active).cloned().collect();
        self.active_tx.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl TargetStore for InMemoryTargetStore {
    fn subscribe_active_targets(&self) -> watch::Receiver<Vec<Target>> {
        self.active_tx.subscribe()
    }

    async fn update_last_triggered(
        &self,
        target_id: Uuid,
        timestamp: i64,
    ) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("simulated write failure".to_string()));
        }
        self.modify(target_id, |stored| {
            stored.last_triggered = stored.last_triggered.max(timestamp);
        })
        .await
        .map(|_| ())
    }
}
