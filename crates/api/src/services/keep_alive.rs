//! Heartbeat keep-alive for the hosting process.
//!
//! While a monitoring session holds it, a background task logs the current
//! tracking summary at a fixed interval so operators can see the engine is
//! alive even when no fixes arrive.

use std::time::Duration;

use domain::services::{KeepAlive, KeepAliveHandle};
use metrics::gauge;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Keep-alive that runs a heartbeat task per acquisition.
#[derive(Debug, Clone)]
pub struct HeartbeatKeepAlive {
    interval: Duration,
}

impl HeartbeatKeepAlive {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl KeepAlive for HeartbeatKeepAlive {
    fn acquire(&self, summary: &str) -> Box<dyn KeepAliveHandle> {
        let (summary_tx, summary_rx) = watch::channel(summary.to_string());
        let cancel = CancellationToken::new();

        gauge!("tracking_keep_alive_held").set(1.0);
        info!(summary = %summary, "Keep-alive acquired");
        tokio::spawn(heartbeat(self.interval, summary_rx, cancel.clone()));

        Box::new(HeartbeatHandle { summary_tx, cancel })
    }
}

async fn heartbeat(period: Duration, summary: watch::Receiver<String>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; acquisition was already logged.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                info!(summary = %summary.borrow().as_str(), "Tracking heartbeat");
            }
        }
    }
    debug!("Heartbeat task finished");
}

struct HeartbeatHandle {
    summary_tx: watch::Sender<String>,
    cancel: CancellationToken,
}

impl KeepAliveHandle for HeartbeatHandle {
    fn update(&self, summary: &str) {
        self.summary_tx.send_if_modified(|current| {
            if current == summary {
                false
            } else {
                summary.clone_into(current);
                true
            }
        });
    }

    fn release(self: Box<Self>) {
        self.cancel.cancel();
        gauge!("tracking_keep_alive_held").set(0.0);
        info!(summary = %self.summary_tx.borrow().as_str(), "Keep-alive released");
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
