//! Business logic services for the POS inventory server

pub mod adjustment;
pub mod auth;
pub mod cash_register;
pub mod catalog;
pub mod dashboard;
pub mod expense;
pub mod inventory;
pub mod movement;
pub mod notification;
pub mod reporting;
pub mod sale;
pub mod stock_ledger;

pub use adjustment::AdjustmentService;
pub use auth::AuthService;
pub use cash_register::CashRegisterService;
pub use catalog::CatalogService;
pub use dashboard::DashboardService;
pub use expense::ExpenseService;
pub use inventory::InventoryService;
pub use movement::MovementService;
pub use notification::Notifier;
pub use reporting::ReportRenderer;
pub use sale::SaleService;

use sqlx::PgConnection;

use crate::error::AppResult;

/// Draw the next value of `sequence` and format it as a display code
pub(crate) async fn next_code(conn: &mut PgConnection, sequence: &str, prefix: &str) -> AppResult<(i64, String)> {
    let seq: i64 = sqlx::query_scalar("SELECT nextval($1::regclass)")
        .bind(sequence)
        .fetch_one(&mut *conn)
        .await?;
    Ok((seq, shared::format_code(prefix, seq)))
}
