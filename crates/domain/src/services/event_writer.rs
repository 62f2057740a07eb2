//! Serialized writer for log records and `last_triggered` updates.
//!
//! Every write produced by a monitoring session goes through one task, so
//! entries reach the stores in the order transitions were detected. Writes
//! never block evaluation: a full queue drops the write with a diagnostic.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::NewLogRecord;
use crate::services::event_log::EventLogSink;
use crate::services::target_store::{StoreError, TargetStore};

/// Default capacity of the write queue.
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 256;

/// A single persistence operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Append(NewLogRecord),
    LastTriggered { target_id: Uuid, timestamp: i64 },
}

impl WriteOp {
    fn kind(&self) -> &'static str {
        match self {
            WriteOp::Append(_) => "append_log",
            WriteOp::LastTriggered { .. } => "last_triggered",
        }
    }
}

/// Sending half of the session writer. Dropping every clone lets the writer
/// task drain its queue and exit.
#[derive(Debug, Clone)]
pub struct EventWriter {
    tx: mpsc::Sender<WriteOp>,
}

impl EventWriter {
    /// Spawns the writer task.
    pub fn spawn(
        event_log: Arc<dyn EventLogSink>,
        targets: Arc<dyn TargetStore>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_writer(rx, event_log, targets));
        (Self { tx }, handle)
    }

    /// Queues a write without waiting.
    pub fn submit(&self, op: WriteOp) {
        match self.tx.try_send(op) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(op)) => {
                metrics::counter!("persistence_write_failures_total", "op" => op.kind())
                    .increment(1);
                warn!(op = op.kind(), "Write queue full, dropping write");
            }
            Err(mpsc::error::TrySendError::Closed(op)) => {
                warn!(op = op.kind(), "Writer stopped, dropping write");
            }
        }
    }

    pub fn append(&self, record: NewLogRecord) {
        self.submit(WriteOp::Append(record));
    }

    pub fn last_triggered(&self, target_id: Uuid, timestamp: i64) {
        self.submit(WriteOp::LastTriggered {
            target_id,
            timestamp,
        });
    }
}

async fn run_writer(
    mut rx: mpsc::Receiver<WriteOp>,
    event_log: Arc<dyn EventLogSink>,
    targets: Arc<dyn TargetStore>,
) {
    while let Some(op) = rx.recv().await {
        write_with_retry(&op, event_log.as_ref(), targets.as_ref()).await;
    }
    debug!("Event writer drained");
}

async fn write_with_retry(op: &WriteOp, event_log: &dyn EventLogSink, targets: &dyn TargetStore) {
    let first = match apply(op, event_log, targets).await {
        Ok(()) => return,
        Err(e) => e,
    };
    debug!(op = op.kind(), error = %first, "Write failed, retrying once");

    if let Err(e) = apply(op, event_log, targets).await {
        metrics::counter!("persistence_write_failures_total", "op" => op.kind()).increment(1);
        warn!(op = op.kind(), error = %e, "Write failed after retry, dropping");
    }
}

async fn apply(
    op: &WriteOp,
    event_log: &dyn EventLogSink,
    targets: &dyn TargetStore,
) -> Result<(), StoreError> {
    match op {
        WriteOp::Append(record) => event_log.append(record.clone()).await.map(|_| ()),
        WriteOp::LastTriggered {
            target_id,
            timestamp,
        } => targets.update_last_triggered(*target_id, *timestamp).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Target;
    use crate::services::event_log::InMemoryEventLog;
    use crate::services::target_store::InMemoryTargetStore;

    async fn setup() -> (Arc<InMemoryEventLog>, Arc<InMemoryTargetStore>, Target) {
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(InMemoryTargetStore::new());
        let target = store.insert(Target::new("Home", 0.0, 0.0, 50)).await;
        (log, store, target)
    }

    #[tokio::test]
    async fn test_writes_are_applied_in_order() {
        let (log, store, target) = setup().await;
        let (writer, handle) = EventWriter::spawn(log.clone(), store.clone(), 16);

        writer.append(NewLogRecord::system("first", 1));
        writer.append(NewLogRecord::system("second", 1));
        writer.last_triggered(target.id, 5_000);
        drop(writer);
        handle.await.unwrap();

        let records = log.list(10).await.unwrap();
        // equal timestamps: higher id first
        assert_eq!(records[0].message, "second");
        assert!(records[0].id > records[1].id);
        assert_eq!(store.get(target.id).await.unwrap().last_triggered, 5_000);
    }

    #[tokio::test]
    async fn test_single_failure_is_retried() {
        let (log, store, target) = setup().await;
        log.fail_next_writes(1);
        store.fail_next_writes(1);
        let (writer, handle) = EventWriter::spawn(log.clone(), store.clone(), 16);

        writer.append(NewLogRecord::system("kept", 1));
        writer.last_triggered(target.id, 7_000);
        drop(writer);
        handle.await.unwrap();

        assert_eq!(log.list(10).await.unwrap().len(), 1);
        assert_eq!(store.get(target.id).await.unwrap().last_triggered, 7_000);
    }

    #[tokio::test]
    async fn test_second_failure_drops_write() {
        let (log, store, _) = setup().await;
        log.fail_next_writes(2);
        let (writer, handle) = EventWriter::spawn(log.clone(), store, 16);

        writer.append(NewLogRecord::system("lost", 1));
        writer.append(NewLogRecord::system("kept", 2));
        drop(writer);
        handle.await.unwrap();

        let records = log.list(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "kept");
    }
}
