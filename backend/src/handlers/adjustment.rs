//! HTTP handlers for inventory adjustments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::AdjustmentDetail;
use crate::services::adjustment::{CreateAdjustmentInput, UpdateAdjustmentInput};
use crate::services::AdjustmentService;
use crate::AppState;

pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<AdjustmentDetail>)> {
    let service = AdjustmentService::new(state.db, &state.config);
    let adjustment = service.create_adjustment(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<AdjustmentDetail>>> {
    let service = AdjustmentService::new(state.db, &state.config);
    Ok(Json(service.list_adjustments().await?))
}

pub async fn get_adjustment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<Json<AdjustmentDetail>> {
    let service = AdjustmentService::new(state.db, &state.config);
    Ok(Json(service.get_adjustment(adjustment_id).await?))
}

/// Replace the lines of an adjustment, applying only the stock differences
pub async fn update_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
    Json(input): Json<UpdateAdjustmentInput>,
) -> AppResult<Json<AdjustmentDetail>> {
    let service = AdjustmentService::new(state.db, &state.config);
    let adjustment = service.update_adjustment(&current_user.0, adjustment_id, input).await?;
    Ok(Json(adjustment))
}

pub async fn delete_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = AdjustmentService::new(state.db, &state.config);
    service.delete_adjustment(&current_user.0, adjustment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
