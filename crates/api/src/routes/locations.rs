//! Location ingestion endpoint handlers.
//!
//! Fixes posted here are pushed into the feed the monitoring loop subscribes
//! to. They are not stored; only the transitions they cause reach history.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::location::{
    ProviderStatus, ProviderStatusRequest, UploadFixRequest, UploadFixResponse,
};
use domain::models::LocationFix;
use domain::services::{FeedError, PushOutcome};
use shared::validation::validate_fix_timestamp;
use tracing::{debug, info};
use validator::Validate;

use crate::app::AppState;
use crate::error::{ApiError, ValidationDetail};
use crate::middleware::metrics::record_fix_ingested;

/// Upload a single location fix.
///
/// POST /api/v1/locations
///
/// Returns 202 with `accepted: false` when the fix was throttled by the
/// current update parameters, and 409 when tracking is not running.
pub async fn upload_fix(
    State(state): State<AppState>,
    Json(request): Json<UploadFixRequest>,
) -> Result<(StatusCode, Json<UploadFixResponse>), ApiError> {
    request.validate()?;
    validate_fix_timestamp(request.timestamp).map_err(|e| ApiError::Validation {
        message: e
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid timestamp".to_string()),
        details: vec![ValidationDetail {
            field: "timestamp".to_string(),
            message: e.code.to_string(),
        }],
    })?;

    let fix = LocationFix::from(request);
    let outcome = state.location.push_fix(fix).map_err(|e| {
        record_fix_ingested(match e {
            FeedError::NotTracking => "not_tracking",
            FeedError::Backpressure => "backpressure",
        });
        ApiError::from(e)
    })?;

    let accepted = outcome == PushOutcome::Delivered;
    record_fix_ingested(if accepted { "delivered" } else { "throttled" });
    debug!(
        timestamp = fix.timestamp,
        accepted,
        "Location fix received"
    );

    Ok((StatusCode::ACCEPTED, Json(UploadFixResponse { accepted })))
}

/// Report a change in the location provider.
///
/// POST /api/v1/locations/provider-status
///
/// `permission_denied` halts a running session; `available` re-grants
/// permission so the next start succeeds; `unavailable` is transient.
pub async fn report_provider_status(
    State(state): State<AppState>,
    Json(request): Json<ProviderStatusRequest>,
) -> Result<StatusCode, ApiError> {
    info!(status = ?request.status, reason = ?request.reason, "Provider status reported");

    match request.status {
        ProviderStatus::Available => state.location.grant_permission(),
        ProviderStatus::PermissionDenied => state.location.revoke_permission(),
        ProviderStatus::Unavailable => {
            let reason = request
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "provider unavailable".to_string());
            state.location.report_unavailable(reason)?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
