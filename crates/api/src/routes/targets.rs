//! Target management endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::target::{
    CreateTargetRequest, ListTargetsQuery, ListTargetsResponse, SetActiveRequest,
    UpdateTargetRequest,
};
use domain::models::Target;
use shared::validation::validate_name;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::{ApiError, ValidationDetail};

fn reject_blank_name(name: Option<&str>) -> Result<(), ApiError> {
    match name.map(validate_name) {
        Some(Err(e)) => Err(ApiError::Validation {
            message: e
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Name must not be blank".to_string()),
            details: vec![ValidationDetail {
                field: "name".to_string(),
                message: e.code.to_string(),
            }],
        }),
        _ => Ok(()),
    }
}

/// Create a target.
///
/// POST /api/v1/targets
pub async fn create_target(
    State(state): State<AppState>,
    Json(request): Json<CreateTargetRequest>,
) -> Result<(StatusCode, Json<Target>), ApiError> {
    request.validate()?;
    reject_blank_name(Some(&request.name))?;

    let max_targets = state.config.limits.max_targets;
    if state.targets.count().await? >= max_targets {
        return Err(ApiError::Conflict(format!(
            "Target limit of {} reached",
            max_targets
        )));
    }

    let mut target = Target::new(
        request.name.trim(),
        request.latitude,
        request.longitude,
        request.radius_meters,
    );
    target.is_active = request.is_active;

    let created = state.targets.create(&target).await?;
    info!(
        target_id = %created.id,
        name = %created.name,
        radius_meters = created.radius_meters,
        "Target created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// List targets, oldest first.
///
/// GET /api/v1/targets?includeInactive=false
pub async fn list_targets(
    State(state): State<AppState>,
    Query(query): Query<ListTargetsQuery>,
) -> Result<Json<ListTargetsResponse>, ApiError> {
    let targets = state.targets.list(query.include_inactive).await?;
    let total = targets.len();
    Ok(Json(ListTargetsResponse { targets, total }))
}

/// GET /api/v1/targets/:target_id
pub async fn get_target(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<Target>, ApiError> {
    Ok(Json(state.targets.get(target_id).await?))
}

/// Partially update a target. Omitted fields keep their values.
///
/// PATCH /api/v1/targets/:target_id
pub async fn update_target(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Json(mut request): Json<UpdateTargetRequest>,
) -> Result<Json<Target>, ApiError> {
    request.validate()?;
    reject_blank_name(request.name.as_deref())?;
    if let Some(name) = request.name.as_mut() {
        *name = name.trim().to_string();
    }

    let updated = state.targets.update(target_id, &request).await?;
    info!(target_id = %target_id, "Target updated");
    Ok(Json(updated))
}

/// Activate or deactivate a target.
///
/// PUT /api/v1/targets/:target_id/active
pub async fn set_target_active(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Target>, ApiError> {
    let updated = state.targets.set_active(target_id, request.active).await?;
    info!(target_id = %target_id, active = request.active, "Target activation changed");
    Ok(Json(updated))
}

/// DELETE /api/v1/targets/:target_id
pub async fn delete_target(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.targets.delete(target_id).await?;
    info!(target_id = %target_id, "Target deleted");
    Ok(StatusCode::NO_CONTENT)
}
