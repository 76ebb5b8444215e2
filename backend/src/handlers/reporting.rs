//! Report export handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::DateRangeQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{CashRegisterService, ReportRenderer, SaleService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportFormatQuery {
    pub format: Option<String>,
}

fn csv_attachment(filename: &str, csv: String) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    ([(header::CONTENT_TYPE, "text/csv".to_string()), (header::CONTENT_DISPOSITION, disposition)], csv).into_response()
}

/// Sales CSV for `?start=&end=`
pub async fn export_sales_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Response> {
    let range = query.range()?;
    let renderer = ReportRenderer::new(state.config.business.offset());
    let service = SaleService::new(state.db, &state.config, state.notifier);

    let sales = service.list_sales(&current_user.0, range).await?;
    let csv = renderer.sales_csv(&sales)?;
    Ok(csv_attachment("sales.csv", csv))
}

/// Cash register session report; JSON by default, CSV with `?format=csv`
pub async fn export_cash_register_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ReportFormatQuery>,
) -> AppResult<Response> {
    let renderer = ReportRenderer::new(state.config.business.offset());
    let service = CashRegisterService::new(state.db);
    let detail = service.get(&current_user.0, session_id).await?;

    match query.format.as_deref() {
        Some("csv") => {
            let csv = renderer.cash_register_csv(&detail)?;
            Ok(csv_attachment(&format!("caja-{}.csv", detail.session.code), csv))
        }
        _ => Ok(Json(detail).into_response()),
    }
}
