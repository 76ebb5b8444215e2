//! HTTP handlers for warehouses, product categories, products, suppliers,
//! clients and expense categories

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Client, ExpenseCategory, Product, ProductCategory, ProductCategoryDetail, Supplier, UpcomingBirthday, Warehouse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::{
    CreateClientInput, CreateProductInput, CreateSupplierInput, ExpenseCategoryInput, ProductCategoryInput,
    UpdateProductInput, UpdateSupplierInput, WarehouseInput,
};
use crate::services::CatalogService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct CountResponse {
    pub count: i64,
}

// ============================================================================
// Warehouses
// ============================================================================

pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<WarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let service = CatalogService::new(state.db, &state.config);
    let warehouse = service.create_warehouse(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn list_warehouses(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<Warehouse>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_warehouses().await?))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.get_warehouse(warehouse_id).await?))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<WarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.update_warehouse(&current_user.0, warehouse_id, input).await?))
}

// ============================================================================
// Products
// ============================================================================

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = CatalogService::new(state.db, &state.config);
    let product = service.create_product(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_products(query.active_only).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.get_product(product_id).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.update_product(&current_user.0, product_id, input).await?))
}

pub async fn count_products(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<CountResponse>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(CountResponse {
        count: service.count_products().await?,
    }))
}

// ============================================================================
// Product categories
// ============================================================================

pub async fn create_product_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductCategoryInput>,
) -> AppResult<(StatusCode, Json<ProductCategory>)> {
    let service = CatalogService::new(state.db, &state.config);
    let category = service.create_product_category(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_product_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductCategory>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_product_categories().await?))
}

pub async fn get_product_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<ProductCategoryDetail>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.get_product_category(category_id).await?))
}

pub async fn update_product_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<ProductCategoryInput>,
) -> AppResult<Json<ProductCategory>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.update_product_category(&current_user.0, category_id, input).await?))
}

pub async fn delete_product_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.db, &state.config);
    service.delete_product_category(&current_user.0, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Suppliers
// ============================================================================

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = CatalogService::new(state.db, &state.config);
    let supplier = service.create_supplier(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn list_suppliers(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<Supplier>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_suppliers().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.get_supplier(supplier_id).await?))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.update_supplier(&current_user.0, supplier_id, input).await?))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.db, &state.config);
    service.delete_supplier(&current_user.0, supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Clients
// ============================================================================

pub async fn create_client(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateClientInput>,
) -> AppResult<(StatusCode, Json<Client>)> {
    let service = CatalogService::new(state.db, &state.config);
    let client = service.create_client(input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<Vec<Client>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_clients().await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.get_client(client_id).await?))
}

pub async fn count_clients(State(state): State<AppState>, _current_user: CurrentUser) -> AppResult<Json<CountResponse>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(CountResponse {
        count: service.count_clients().await?,
    }))
}

pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<UpcomingBirthday>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.upcoming_birthdays(query.limit.unwrap_or(5)).await?))
}

// ============================================================================
// Expense categories
// ============================================================================

pub async fn create_expense_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<ExpenseCategoryInput>,
) -> AppResult<(StatusCode, Json<ExpenseCategory>)> {
    let service = CatalogService::new(state.db, &state.config);
    let category = service.create_expense_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_expense_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ExpenseCategory>>> {
    let service = CatalogService::new(state.db, &state.config);
    Ok(Json(service.list_expense_categories().await?))
}
