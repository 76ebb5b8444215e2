//! HTTP handlers for sales

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{ChartPeriod, ChartPoint, Sale, SaleWithLines, TopProduct};
use uuid::Uuid;

use super::{CountResponse, DateRangeQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::sale::SaleInput;
use crate::services::SaleService;
use crate::AppState;

const DEFAULT_SALE_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaleLimitQuery {
    pub limit: Option<i64>,
}

fn sale_service(state: AppState) -> SaleService {
    SaleService::new(state.db, &state.config, state.notifier)
}

pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SaleInput>,
) -> AppResult<(StatusCode, Json<SaleWithLines>)> {
    let sale = sale_service(state).create_sale(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Sales in `?start=&end=`, own sales only unless admin
pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<SaleWithLines>>> {
    let range = query.range()?;
    Ok(Json(sale_service(state).list_sales(&current_user.0, range).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleWithLines>> {
    Ok(Json(sale_service(state).get_sale(&current_user.0, sale_id).await?))
}

pub async fn update_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<SaleInput>,
) -> AppResult<Json<SaleWithLines>> {
    Ok(Json(sale_service(state).update_sale(&current_user.0, sale_id, input).await?))
}

pub async fn void_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleWithLines>> {
    Ok(Json(sale_service(state).void_sale(&current_user.0, sale_id).await?))
}

pub async fn restore_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleWithLines>> {
    Ok(Json(sale_service(state).restore_sale(&current_user.0, sale_id).await?))
}

/// Only voided sales can be deleted
pub async fn delete_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    sale_service(state).delete_sale(&current_user.0, sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn count_sales(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<CountResponse>> {
    Ok(Json(CountResponse {
        count: sale_service(state).count_sales().await?,
    }))
}

pub async fn top_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SaleLimitQuery>,
) -> AppResult<Json<Vec<TopProduct>>> {
    let limit = query.limit.unwrap_or(DEFAULT_SALE_LIMIT).max(1);
    Ok(Json(sale_service(state).top_products(limit).await?))
}

pub async fn latest_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SaleLimitQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    let limit = query.limit.unwrap_or(DEFAULT_SALE_LIMIT).max(1);
    Ok(Json(sale_service(state).latest_sales(limit).await?))
}

/// `?period=week|month|all`, defaults to `week`
pub async fn sales_chart(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ChartQuery>,
) -> AppResult<Json<Vec<ChartPoint>>> {
    let period = match query.period.as_deref() {
        None => ChartPeriod::Week,
        Some(value) => ChartPeriod::parse(value)
            .ok_or_else(|| AppError::validation("period", "must be one of week, month, all"))?,
    };
    Ok(Json(sale_service(state).chart(period).await?))
}
