//! Route definitions for the POS inventory API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (login is public)
        .nest("/auth", auth_routes(&state))
        .nest("/users", user_routes(&state))
        // Catalog
        .nest("/warehouses", warehouse_routes(&state))
        .nest("/product-categories", product_category_routes(&state))
        .nest("/products", product_routes(&state))
        .nest("/suppliers", supplier_routes(&state))
        .nest("/clients", client_routes(&state))
        .nest("/expense-categories", expense_category_routes(&state))
        // Stock
        .nest("/inventory", inventory_routes(&state))
        .nest("/adjustments", adjustment_routes(&state))
        // Point of sale
        .nest("/sales", sale_routes(&state))
        .nest("/cash-registers", cash_register_routes(&state))
        .nest("/expenses", expense_routes(&state))
        .nest("/dashboard", dashboard_routes(&state))
        .nest("/reports", report_routes(&state))
        .nest("/notifications", notification_routes(&state))
}

/// Authentication routes
fn auth_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/register", post(handlers::register))
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/login", post(handlers::login))
        .merge(protected)
}

/// User management routes (protected)
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users))
        .route("/:user_id", put(handlers::update_user).delete(handlers::delete_user))
        .route("/:user_id/toggle-active", post(handlers::toggle_user_active))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Warehouse routes (protected)
fn warehouse_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route("/:warehouse_id", get(handlers::get_warehouse).put(handlers::update_warehouse))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Product category routes (protected)
fn product_category_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_product_categories).post(handlers::create_product_category))
        .route(
            "/:category_id",
            get(handlers::get_product_category)
                .put(handlers::update_product_category)
                .delete(handlers::delete_product_category),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Product routes (protected)
fn product_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/count", get(handlers::count_products))
        .route("/:product_id", get(handlers::get_product).put(handlers::update_product))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Client routes (protected)
fn client_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_clients).post(handlers::create_client))
        .route("/count", get(handlers::count_clients))
        .route("/birthdays", get(handlers::upcoming_birthdays))
        .route("/:client_id", get(handlers::get_client))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Expense category routes (protected)
fn expense_category_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_expense_categories).post(handlers::create_expense_category))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Stock
        .route("/", get(handlers::list_inventory))
        .route("/sellable", get(handlers::list_sellable))
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/warehouses/:warehouse_id", get(handlers::stock_by_warehouse))
        .route("/products/:product_id", get(handlers::stock_by_product))
        .route("/records/:stock_record_id", get(handlers::get_stock_record))
        // Movements
        .route("/movements", get(handlers::list_movements))
        .route("/movements/latest", get(handlers::latest_movements))
        .route("/movements/products/:product_id", get(handlers::movements_by_product))
        .route("/movements/warehouses/:warehouse_id", get(handlers::movements_by_warehouse))
        // Stock changes
        .route("/initial-load", post(handlers::initial_load))
        .route("/import", post(handlers::import_stock_csv))
        .route("/modify-unit", post(handlers::modify_unit_stock))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Adjustment routes (protected)
fn adjustment_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_adjustments).post(handlers::create_adjustment))
        .route(
            "/:adjustment_id",
            get(handlers::get_adjustment)
                .put(handlers::update_adjustment)
                .delete(handlers::delete_adjustment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Sale routes (protected)
fn sale_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/count", get(handlers::count_sales))
        .route("/top-products", get(handlers::top_products))
        .route("/latest", get(handlers::latest_sales))
        .route("/chart", get(handlers::sales_chart))
        .route(
            "/:sale_id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
        .route("/:sale_id/void", post(handlers::void_sale))
        .route("/:sale_id/restore", post(handlers::restore_sale))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Cash register routes (protected)
fn cash_register_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_cash_registers).post(handlers::open_cash_register))
        .route("/status", get(handlers::cash_register_status))
        .route(
            "/:session_id",
            get(handlers::get_cash_register).delete(handlers::remove_cash_register),
        )
        .route("/:session_id/close", post(handlers::close_cash_register))
        .route("/:session_id/recompute", post(handlers::recompute_cash_register))
        .route("/:session_id/reopen", post(handlers::reopen_cash_register))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Expense routes (protected)
fn expense_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_expenses).post(handlers::create_expense))
        .route("/count", get(handlers::count_expenses))
        .route(
            "/:expense_id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Report export routes (protected)
fn report_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/sales", get(handlers::export_sales_report))
        .route("/cash-registers/:session_id", get(handlers::export_cash_register_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Notification stream (protected)
fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/stream", get(handlers::notification_stream))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
