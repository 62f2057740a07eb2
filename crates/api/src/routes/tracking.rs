//! Tracking lifecycle endpoint handlers.

use axum::{extract::State, Json};
use domain::models::TrackingStatus;
use domain::services::ControlCommand;
use tracing::info;

use crate::app::AppState;

async fn dispatch(state: &AppState, command: ControlCommand) -> Json<TrackingStatus> {
    info!(command = %command, "Tracking command received");
    state.controller.handle(command).await;
    Json(state.controller.current_status())
}

/// Start monitoring. Starting while already running changes nothing.
///
/// POST /api/v1/tracking/start
pub async fn start_tracking(State(state): State<AppState>) -> Json<TrackingStatus> {
    dispatch(&state, ControlCommand::Start).await
}

/// Stop monitoring. Stopping while stopped changes nothing.
///
/// POST /api/v1/tracking/stop
pub async fn stop_tracking(State(state): State<AppState>) -> Json<TrackingStatus> {
    dispatch(&state, ControlCommand::Stop).await
}

/// GET /api/v1/tracking/status
pub async fn get_status(State(state): State<AppState>) -> Json<TrackingStatus> {
    Json(state.controller.current_status())
}
