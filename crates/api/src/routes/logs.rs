//! Activity history endpoint handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::activity_log::{ClearLogsResponse, ListLogsQuery, ListLogsResponse};
use domain::services::EventLogSink;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

/// Clamps a requested page size into `1..=max`.
fn page_size(requested: i64, max: i64) -> usize {
    usize::try_from(requested.clamp(1, max.max(1))).unwrap_or(1)
}

/// List history entries, newest first. `total` counts the whole history,
/// not just the returned page.
///
/// GET /api/v1/logs?limit=100
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<ListLogsResponse>, ApiError> {
    let limit = page_size(query.limit, state.config.limits.max_log_page_size);
    let logs = state.logs.list(limit).await?;
    let total = usize::try_from(state.logs.count().await?).unwrap_or(logs.len());
    Ok(Json(ListLogsResponse { logs, total }))
}

/// Delete the whole history.
///
/// DELETE /api/v1/logs
pub async fn clear_logs(State(state): State<AppState>) -> Result<Json<ClearLogsResponse>, ApiError> {
    let deleted = state.logs.clear().await?;
    info!(deleted, "Activity history cleared");
    Ok(Json(ClearLogsResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_clamps() {
        assert_eq!(page_size(100, 500), 100);
        assert_eq!(page_size(0, 500), 1);
        assert_eq!(page_size(-5, 500), 1);
        assert_eq!(page_size(10_000, 500), 500);
        assert_eq!(page_size(10, 0), 1);
    }
}
