//! Database models for the POS inventory server
//!
//! Re-exports models from the shared crate and adds backend-specific read models

pub use shared::models::*;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Stock record joined with its warehouse and product
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub stock_record_id: Uuid,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub brand: Option<String>,
    pub unit_of_measure: String,
    pub sale_price: Decimal,
    pub quantity_on_hand: Decimal,
    pub last_purchase_price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Adjustment header joined with warehouse and user names
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdjustmentSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub adjustment: InventoryAdjustment,
    pub warehouse_name: Option<String>,
    pub user_name: Option<String>,
}

/// Adjustment line enriched with product data and current stock
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdjustmentLineView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub line: AdjustmentLine,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub current_stock: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentDetail {
    #[serde(flatten)]
    pub summary: AdjustmentSummary,
    pub lines: Vec<AdjustmentLineView>,
}
