//! Common validation utilities.

use chrono::{TimeZone, Utc};
use validator::ValidationError;

/// Maximum age of a location fix in seconds. Older fixes say nothing about
/// where the device is now.
const MAX_FIX_AGE_SECS: i64 = 3600;

/// Maximum allowed future timestamp tolerance in seconds (5 minutes for clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(error("latitude_range", "Latitude must be between -90 and 90"))
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(error(
            "longitude_range",
            "Longitude must be between -180 and 180",
        ))
    }
}

/// Validates that a target name has visible content.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(error("name_blank", "Name must not be blank"))
    } else {
        Ok(())
    }
}

/// Validates the timestamp (milliseconds since epoch) of a live location fix.
/// - Must not be more than 5 minutes in the future (allows for clock skew)
/// - Must not be older than one hour
pub fn validate_fix_timestamp(timestamp_millis: i64) -> Result<(), ValidationError> {
    let now = Utc::now();

    let Some(timestamp) = Utc.timestamp_millis_opt(timestamp_millis).single() else {
        return Err(error("timestamp_invalid", "Invalid timestamp format"));
    };

    if timestamp > now + chrono::Duration::seconds(MAX_FUTURE_TOLERANCE_SECS) {
        return Err(error(
            "timestamp_future",
            "Timestamp cannot be in the future",
        ));
    }

    if timestamp < now - chrono::Duration::seconds(MAX_FIX_AGE_SECS) {
        return Err(error(
            "timestamp_stale",
            "Timestamp cannot be older than 1 hour",
        ));
    }

    Ok(())
}
