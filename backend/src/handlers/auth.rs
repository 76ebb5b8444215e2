//! Authentication and user management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::User;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthResponse, RegisterUserInput, UpdateUserInput};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login endpoint handler
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> AppResult<Json<AuthResponse>> {
    let service = AuthService::new(state.db, &state.config);
    let response = service.login(&body.username, &body.password).await?;
    Ok(Json(response))
}

/// Register a user (admin only)
pub async fn register(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.register(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Profile of the authenticated user
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> AppResult<Json<User>> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

pub async fn list_users(State(state): State<AppState>, current_user: CurrentUser) -> AppResult<Json<Vec<User>>> {
    let service = AuthService::new(state.db, &state.config);
    let users = service.list_users(&current_user.0).await?;
    Ok(Json(users))
}

pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.update_user(&current_user.0, user_id, input).await?;
    Ok(Json(user))
}

pub async fn toggle_user_active(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.toggle_active(&current_user.0, user_id).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = AuthService::new(state.db, &state.config);
    service.delete_user(&current_user.0, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
