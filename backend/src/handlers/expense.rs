//! HTTP handlers for expenses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Expense, ExpenseView};
use uuid::Uuid;

use super::{CountResponse, DateRangeQuery};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::expense::{CreateExpenseInput, UpdateExpenseInput};
use crate::services::ExpenseService;
use crate::AppState;

pub async fn create_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    let expense = service.create_expense(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<ExpenseView>>> {
    let range = query.range()?;
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    Ok(Json(service.list_expenses(&current_user.0, range).await?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<ExpenseView>> {
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    Ok(Json(service.get_expense(&current_user.0, expense_id).await?))
}

pub async fn update_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
    Json(input): Json<UpdateExpenseInput>,
) -> AppResult<Json<Expense>> {
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    Ok(Json(service.update_expense(&current_user.0, expense_id, input).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    service.delete_expense(&current_user.0, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn count_expenses(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<CountResponse>> {
    let service = ExpenseService::new(state.db, &state.config, state.notifier);
    Ok(Json(CountResponse {
        count: service.count_expenses().await?,
    }))
}
