use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::DashboardSummary;
use crate::services::DashboardService;
use crate::AppState;

/// Top products, latest sales, birthdays and entity counts
pub async fn get_dashboard(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<DashboardSummary>> {
    let service = DashboardService::new(state.db, &state.config, state.notifier);
    Ok(Json(service.summary().await?))
}
