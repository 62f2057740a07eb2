//! Fixtures shared by service tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::models::{LocationFix, Target};
use crate::services::alert::AlertSink;
use crate::services::keep_alive::{KeepAlive, KeepAliveHandle};

/// An arbitrary fixed "now" for deterministic timestamps.
pub const T0: i64 = 1_700_000_000_000;

/// Length of one degree of latitude at the equator on WGS-84.
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.27;

/// A fix `meters` due north of (0, 0).
pub fn fix_north(meters: f64, timestamp: i64) -> LocationFix {
    LocationFix::new(meters / METERS_PER_DEGREE_LATITUDE, 0.0, timestamp)
}

/// An active, never-triggered target centered on (0, 0).
pub fn target_at_origin(name: &str, radius_meters: i32) -> Target {
    Target::new(name, 0.0, 0.0, radius_meters)
}

/// Waits until the watched value satisfies `predicate`, failing the test
/// after two seconds.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let value = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for value")
        .expect("sender dropped");
    value.clone()
}

#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    fired: Mutex<Vec<String>>,
}

impl RecordingAlertSink {
    pub fn fired(&self) -> Vec<String> {
        self.fired.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingAlertSink {
    fn fire(&self, target_name: &str) {
        self.fired.lock().unwrap().push(target_name.to_string());
    }
}

#[derive(Debug, Default)]
pub struct KeepAliveRecord {
    pub acquired: usize,
    pub released: usize,
    pub summaries: Vec<String>,
}

impl KeepAliveRecord {
    pub fn held(&self) -> bool {
        self.acquired > self.released
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordingKeepAlive {
    record: Arc<Mutex<KeepAliveRecord>>,
}

impl RecordingKeepAlive {
    pub fn held(&self) -> bool {
        self.record.lock().unwrap().held()
    }

    pub fn acquired(&self) -> usize {
        self.record.lock().unwrap().acquired
    }

    pub fn last_summary(&self) -> Option<String> {
        self.record.lock().unwrap().summaries.last().cloned()
    }
}

struct RecordingHandle {
    record: Arc<Mutex<KeepAliveRecord>>,
}

impl KeepAlive for RecordingKeepAlive {
    fn acquire(&self, summary: &str) -> Box<dyn KeepAliveHandle> {
        let mut record = self.record.lock().unwrap();
        record.acquired += 1;
        record.summaries.push(summary.to_string());
        Box::new(RecordingHandle {
            record: self.record.clone(),
        })
    }
}

impl KeepAliveHandle for RecordingHandle {
    fn update(&self, summary: &str) {
        self.record.lock().unwrap().summaries.push(summary.to_string());
    }

    fn release(self: Box<Self>) {
        self.record.lock().unwrap().released += 1;
    }
}
