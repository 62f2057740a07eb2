//! Human-readable tracking status published by the monitoring loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_NO_TARGETS: &str = "no active targets";
pub const STATUS_PERMISSION_REVOKED: &str = "tracking halted: permission revoked";
pub const STATUS_SIGNAL_LOST: &str = "signal lost";
pub const STATUS_STOPPED: &str = "tracking stopped";
pub const STATUS_WAITING: &str = "waiting for location fix";

/// Coarse lifecycle state of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Stopped,
    Running,
    /// Stopped on its own because of a terminal failure.
    Halted,
}

/// Display-only motion classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Moving,
    Stationary,
}

impl MotionState {
    /// Classifies a fix speed; a missing speed counts as stationary.
    pub fn classify(speed_meters_per_second: Option<f64>, threshold: f64) -> Self {
        match speed_meters_per_second {
            Some(speed) if speed > threshold => Self::Moving,
            _ => Self::Stationary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moving => "moving",
            Self::Stationary => "stationary",
        }
    }
}

/// The closest active target to the latest fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestTarget {
    pub target_id: Uuid,
    pub name: String,
    pub distance_meters: f64,
    /// `"850 m"` / `"1.2 km"`
    pub distance_label: String,
}

impl NearestTarget {
    pub fn new(target_id: Uuid, name: impl Into<String>, distance_meters: f64) -> Self {
        Self {
            target_id,
            name: name.into(),
            distance_meters,
            distance_label: shared::geodesy::format_distance(distance_meters),
        }
    }
}

/// Status summary shown to the user and pushed to the keep-alive token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatus {
    pub state: TrackingState,
    pub summary: String,
    pub nearest: Option<NearestTarget>,
    pub motion: Option<MotionState>,
    /// Timestamp of the last evaluated fix.
    pub last_fix_at: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingStatus {
    fn with_state(state: TrackingState, summary: impl Into<String>) -> Self {
        Self {
            state,
            summary: summary.into(),
            nearest: None,
            motion: None,
            last_fix_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn stopped() -> Self {
        Self::with_state(TrackingState::Stopped, STATUS_STOPPED)
    }

    pub fn halted(summary: impl Into<String>) -> Self {
        Self::with_state(TrackingState::Halted, summary)
    }

    pub fn waiting() -> Self {
        Self::with_state(TrackingState::Running, STATUS_WAITING)
    }

    pub fn no_targets() -> Self {
        Self::with_state(TrackingState::Running, STATUS_NO_TARGETS)
    }

    pub fn signal_lost() -> Self {
        Self::with_state(TrackingState::Running, STATUS_SIGNAL_LOST)
    }

    /// Status after evaluating a fix against at least one active target.
    pub fn tracking(nearest: NearestTarget, motion: MotionState, fix_timestamp: i64) -> Self {
        let summary = format!(
            "{} · {} · {}",
            nearest.name,
            nearest.distance_label,
            motion.as_str()
        );
        Self {
            state: TrackingState::Running,
            summary,
            nearest: Some(nearest),
            motion: Some(motion),
            last_fix_at: Some(fix_timestamp),
            updated_at: Utc::now(),
        }
    }

    /// Records which fix produced this status.
    pub fn at_fix(mut self, fix_timestamp: i64) -> Self {
        self.last_fix_at = Some(fix_timestamp);
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == TrackingState::Running
    }
}
