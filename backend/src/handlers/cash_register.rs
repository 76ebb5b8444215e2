//! HTTP handlers for cash register sessions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{CashRegisterDetail, CashRegisterSession, CashRegisterSummary, SessionStatus};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::cash_register::OpenSessionInput;
use crate::services::CashRegisterService;
use crate::AppState;

pub async fn open_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<OpenSessionInput>,
) -> AppResult<(StatusCode, Json<CashRegisterSession>)> {
    let service = CashRegisterService::new(state.db);
    let session = service.open(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Status of the caller's latest session
pub async fn cash_register_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SessionStatus>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.check_latest_status(current_user.0.user_id).await?))
}

pub async fn close_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CashRegisterSession>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.close(&current_user.0, session_id).await?))
}

/// Recompute the close snapshot of an open or closed session
pub async fn recompute_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CashRegisterSession>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.close_edit(&current_user.0, session_id).await?))
}

pub async fn reopen_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CashRegisterSession>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.reopen(&current_user.0, session_id).await?))
}

pub async fn remove_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CashRegisterService::new(state.db);
    service.remove(&current_user.0, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_cash_registers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<CashRegisterSummary>>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.list(&current_user.0).await?))
}

pub async fn get_cash_register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CashRegisterDetail>> {
    let service = CashRegisterService::new(state.db);
    Ok(Json(service.get(&current_user.0, session_id).await?))
}
