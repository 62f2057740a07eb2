//! Location fix domain model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One location sample delivered by the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Only used to classify motion for the status summary.
    pub speed_meters_per_second: Option<f64>,
    pub accuracy_meters: Option<f64>,
    /// Epoch millis; cooldown comparisons are made against this value.
    pub timestamp: i64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            speed_meters_per_second: None,
            accuracy_meters: None,
            timestamp,
        }
    }

    pub fn with_speed(mut self, speed_meters_per_second: f64) -> Self {
        self.speed_meters_per_second = Some(speed_meters_per_second);
        self
    }

    /// The fix position as a `(latitude, longitude)` pair.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Parameters passed to the location source when requesting updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateConfig {
    pub high_accuracy: bool,
    pub min_interval_ms: u64,
    pub min_distance_meters: f64,
}

impl Default for LocationUpdateConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            min_interval_ms: 1000,
            min_distance_meters: 2.0,
        }
    }
}

/// Request payload for submitting a location fix.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadFixRequest {
    /// Timestamp in milliseconds since epoch
    pub timestamp: i64,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 0.0, message = "Accuracy must be non-negative"))]
    pub accuracy: Option<f64>,

    #[validate(range(min = 0.0, message = "Speed must be non-negative"))]
    pub speed: Option<f64>,
}

impl From<UploadFixRequest> for LocationFix {
    fn from(request: UploadFixRequest) -> Self {
        Self {
            latitude: request.latitude,
            longitude: request.longitude,
            speed_meters_per_second: request.speed,
            accuracy_meters: request.accuracy,
            timestamp: request.timestamp,
        }
    }
}

/// Availability reported by the device's location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Available,
    Unavailable,
    PermissionDenied,
}

/// Request payload for reporting provider availability.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusRequest {
    pub status: ProviderStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response payload for fix submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFixResponse {
    pub accepted: bool,
}
