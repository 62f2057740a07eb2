//! Target (zone) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// A named point with a radius the user wants to be alerted about on entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i32,
    pub is_active: bool,
    /// Epoch millis of the most recent alert, `0` when never triggered.
    pub last_triggered: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reasons a stored target cannot take part in evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedTarget {
    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(i32),

    #[error("center ({latitude}, {longitude}) is not a valid coordinate")]
    InvalidCenter { latitude: f64, longitude: f64 },

    #[error("name is blank")]
    BlankName,
}

impl Target {
    /// Creates an active, never-triggered target.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, radius_meters: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            latitude,
            longitude,
            radius_meters,
            is_active: true,
            last_triggered: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The target center as a `(latitude, longitude)` pair.
    pub fn center(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn has_triggered(&self) -> bool {
        self.last_triggered > 0
    }

    /// Checks the data-integrity rules a target must satisfy to be evaluated.
    pub fn check_integrity(&self) -> Result<(), MalformedTarget> {
        if self.radius_meters <= 0 {
            return Err(MalformedTarget::NonPositiveRadius(self.radius_meters));
        }
        if shared::validation::validate_latitude(self.latitude).is_err()
            || shared::validation::validate_longitude(self.longitude).is_err()
        {
            return Err(MalformedTarget::InvalidCenter {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        if shared::validation::validate_name(&self.name).is_err() {
            return Err(MalformedTarget::BlankName);
        }
        Ok(())
    }
}

fn default_active() -> bool {
    true
}

/// Request payload for creating a target.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 1, max = 50000, message = "Radius must be between 1 and 50000 meters"))]
    pub radius_meters: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Request payload for updating a target (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTargetRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,

    #[validate(range(min = 1, max = 50000, message = "Radius must be between 1 and 50000 meters"))]
    pub radius_meters: Option<i32>,

    pub is_active: Option<bool>,
}

impl UpdateTargetRequest {
    /// Applies the provided fields to `target`, leaving the rest untouched.
    pub fn apply_to(&self, target: &mut Target) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(latitude) = self.latitude {
            target.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            target.longitude = longitude;
        }
        if let Some(radius) = self.radius_meters {
            target.radius_meters = radius;
        }
        if let Some(active) = self.is_active {
            target.is_active = active;
        }
        target.updated_at = Utc::now();
    }
}

/// Request payload for toggling a target on or off.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Response for listing targets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTargetsResponse {
    pub targets: Vec<Target>,
    pub total: usize,
}

/// Query parameters for listing targets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTargetsQuery {
    #[serde(default = "default_active")]
    pub include_inactive: bool,
}
