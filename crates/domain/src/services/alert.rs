//! User-facing alert seam.

/// Destination for entry alerts.
///
/// Called only for transitions that passed the cooldown check. Implementations
/// must return promptly; the monitoring loop calls this inline.
pub trait AlertSink: Send + Sync {
    fn fire(&self, target_name: &str);
}

/// Alert sink that emits a structured log line per alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAlertSink;

impl AlertSink for LoggingAlertSink {
    fn fire(&self, target_name: &str) {
        metrics::counter!("alerts_fired_total").increment(1);
        tracing::info!(target_name = %target_name, "Proximity alert");
    }
}
