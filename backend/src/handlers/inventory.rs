//! HTTP handlers for stock queries, movements, initial load and CSV import

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{StockMovement, StockRecord};
use uuid::Uuid;

use super::DateRangeQuery;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::InventoryItem;
use crate::services::adjustment::ModifyUnitStockInput;
use crate::services::inventory::{ImportReport, InitialLoadInput};
use crate::services::movement::DEFAULT_LATEST_MOVEMENTS;
use crate::services::{AdjustmentService, InventoryService, MovementService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LatestMovementsQuery {
    pub limit: Option<i64>,
}

pub async fn list_inventory(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.list_inventory().await?))
}

/// Active products with stock on hand
pub async fn list_sellable(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.sellable().await?))
}

pub async fn list_low_stock(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<InventoryItem>>> {
    let threshold = Decimal::from(state.config.business.low_stock_threshold);
    let service = InventoryService::new(state.db);
    Ok(Json(service.low_stock(threshold).await?))
}

pub async fn stock_by_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.by_warehouse(warehouse_id).await?))
}

pub async fn stock_by_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.by_product(product_id).await?))
}

pub async fn get_stock_record(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(stock_record_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.record(stock_record_id).await?))
}

// ============================================================================
// Movements
// ============================================================================

pub async fn list_movements(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<StockMovement>>> {
    let service = MovementService::new(state.db);
    Ok(Json(service.all().await?))
}

pub async fn latest_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<LatestMovementsQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_MOVEMENTS).max(1);
    let service = MovementService::new(state.db);
    Ok(Json(service.latest(limit).await?))
}

pub async fn movements_by_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let range = query.range()?;
    let offset = state.config.business.offset();
    let service = MovementService::new(state.db);
    Ok(Json(service.by_product(product_id, range, offset).await?))
}

pub async fn movements_by_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = MovementService::new(state.db);
    Ok(Json(service.by_warehouse(warehouse_id).await?))
}

// ============================================================================
// Stock changes
// ============================================================================

/// Opening stock for a warehouse (admin only)
pub async fn initial_load(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<InitialLoadInput>,
) -> AppResult<(StatusCode, Json<Vec<StockRecord>>)> {
    let service = InventoryService::new(state.db);
    let records = service.initial_load(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(records)))
}

/// Multipart upload with a `warehouse_id` field and a `file` field holding
/// `product_code,quantity,purchase_price` rows
pub async fn import_stock_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    let mut warehouse_id: Option<Uuid> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("warehouse_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::ValidationError(format!("Invalid warehouse_id field: {}", e)))?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::validation("warehouse_id", "must be a UUID"))?;
                warehouse_id = Some(id);
            }
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::ValidationError(format!("Invalid file field: {}", e)))?;
                data = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let warehouse_id = warehouse_id.ok_or_else(|| AppError::validation("warehouse_id", "is required"))?;
    let data = data.ok_or_else(|| AppError::validation("file", "is required"))?;

    let service = InventoryService::new(state.db);
    let report = service.import_csv(&current_user.0, warehouse_id, &data).await?;
    Ok(Json(report))
}

/// Single-product adjustment against the default warehouse
pub async fn modify_unit_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ModifyUnitStockInput>,
) -> AppResult<Json<StockRecord>> {
    let service = AdjustmentService::new(state.db, &state.config);
    Ok(Json(service.modify_unit_stock(&current_user.0, input).await?))
}
