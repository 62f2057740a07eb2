//! Append-only transition history.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{watch, Mutex};

use crate::models::{LogRecord, NewLogRecord};
use crate::services::target_store::StoreError;

/// Destination for history entries produced by the monitoring loop.
#[async_trait::async_trait]
pub trait EventLogSink: Send + Sync {
    /// Appends an entry and returns it with its assigned id.
    async fn append(&self, record: NewLogRecord) -> Result<LogRecord, StoreError>;

    /// Live view of the full history, newest first.
    fn subscribe_all(&self) -> watch::Receiver<Vec<LogRecord>>;

    /// Up to `limit` entries, newest first.
    async fn list(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError>;

    /// Removes every entry, returning how many were removed.
    async fn clear(&self) -> Result<u64, StoreError>;
}

/// Newest first; entries with equal timestamps keep insertion order reversed.
pub fn sort_newest_first(records: &mut [LogRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[derive(Debug, Default)]
struct LogState {
    next_id: i64,
    records: Vec<LogRecord>,
}

/// Event log kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryEventLog {
    state: Mutex<LogState>,
    records_tx: watch::Sender<Vec<LogRecord>>,
    failing_writes: AtomicUsize,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        let (records_tx, _) = watch::channel(Vec::new());
        Self {
            state: Mutex::new(LogState {
                next_id: 1,
                records: Vec::new(),
            }),
            records_tx,
            failing_writes: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` appends fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl EventLogSink for InMemoryEventLog {
    async fn append(&self, record: NewLogRecord) -> Result<LogRecord, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("simulated write failure".to_string()));
        }

        let mut state = self.state.lock().await;
        let stored = record.with_id(state.next_id);
        state.next_id += 1;
        state.records.push(stored.clone());

        let mut snapshot = state.records.clone();
        sort_newest_first(&mut snapshot);
        self.records_tx.send_replace(snapshot);

        Ok(stored)
    }

    fn subscribe_all(&self) -> watch::Receiver<Vec<LogRecord>> {
        self.records_tx.subscribe()
    }

    async fn list(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        Ok(self.records_tx.borrow().iter().take(limit).cloned().collect())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.records.len() as u64;
        state.records.clear();
        self.records_tx.send_replace(Vec::new());
        Ok(removed)
    }
}
