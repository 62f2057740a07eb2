//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::TrackingState;
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub tracking: TrackingHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Monitoring loop state as seen by the health check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackingHealth {
    pub state: TrackingState,
    pub summary: String,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn ping_database(state: &AppState) -> Option<u64> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .ok()
        .map(|_| start.elapsed().as_millis() as u64)
}

/// Full health check endpoint.
///
/// A halted monitoring loop is reported but does not make the service
/// unhealthy; only a lost database does.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let latency_ms = ping_database(&state).await;
    let status = state.controller.current_status();

    let response = HealthResponse {
        status: if latency_ms.is_some() { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: latency_ms.is_some(),
            latency_ms,
        },
        tracking: TrackingHealth {
            state: status.state,
            summary: status.summary,
        },
    };

    if response.database.connected {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match ping_database(&state).await {
        Some(_) => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
