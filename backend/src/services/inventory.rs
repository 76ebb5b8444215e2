//! Inventory queries, initial stock load and CSV stock import

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{movement_tag, StockOp, StockRecord};
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::movement::apply_stock_op;
use super::stock_ledger::set_last_purchase_price_tx;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::InventoryItem;

/// Inventory service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// One product of an initial inventory load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialLoadItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub purchase_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InitialLoadInput {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub items: Vec<InitialLoadItem>,
}

/// CSV row: `product_code,quantity,purchase_price`
#[derive(Debug, Deserialize)]
struct CsvStockRow {
    product_code: String,
    quantity: String,
    purchase_price: Option<String>,
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
}

const ITEM_SELECT: &str = r#"
    SELECT s.id AS stock_record_id, s.warehouse_id, w.name AS warehouse_name,
           s.product_id, p.code AS product_code, p.name AS product_name, p.brand,
           p.unit_of_measure, p.sale_price, s.quantity_on_hand, s.last_purchase_price, s.updated_at
    FROM stock_records s
    JOIN warehouses w ON w.id = s.warehouse_id
    JOIN products p ON p.id = s.product_id
"#;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|_| format!("invalid {} '{}'", field, value))
}

/// Add stock for one line and record the purchase price when given
async fn receive_stock_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    purchase_price: Option<Decimal>,
    description: &str,
) -> AppResult<StockRecord> {
    let record = apply_stock_op(conn, &StockOp::ingress(warehouse_id, product_id, quantity, description)).await?;
    if let Some(price) = purchase_price {
        shared::validate_non_negative_amount(price).map_err(|m| AppError::validation("purchase_price", m))?;
        set_last_purchase_price_tx(conn, record.id, shared::round2(price)).await?;
    }
    Ok(record)
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Every stock record with its warehouse and product
    pub async fn list_inventory(&self) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!("{} ORDER BY p.name, w.name", ITEM_SELECT))
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    /// Active products with stock on hand
    pub async fn sellable(&self) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "{} WHERE p.is_active AND s.quantity_on_hand > 0 ORDER BY p.name, w.name",
            ITEM_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Records with some stock left but below `threshold`
    pub async fn low_stock(&self, threshold: Decimal) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "{} WHERE s.quantity_on_hand > 0 AND s.quantity_on_hand < $1 ORDER BY s.quantity_on_hand",
            ITEM_SELECT
        ))
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "{} WHERE s.warehouse_id = $1 ORDER BY p.name",
            ITEM_SELECT
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Where a product is stocked
    pub async fn by_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "{} WHERE s.product_id = $1 ORDER BY w.name",
            ITEM_SELECT
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn record(&self, stock_record_id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!("{} WHERE s.id = $1", ITEM_SELECT))
            .bind(stock_record_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Stock record"))
    }

    /// Load opening stock into one warehouse; all items or none
    pub async fn initial_load(&self, actor: &AuthUser, input: InitialLoadInput) -> AppResult<Vec<StockRecord>> {
        actor.require_admin()?;
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let mut records = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let record = receive_stock_tx(
                &mut tx,
                input.warehouse_id,
                item.product_id,
                item.quantity,
                item.purchase_price,
                movement_tag::INITIAL_INVENTORY,
            )
            .await?;
            records.push(record);
        }
        tx.commit().await?;

        tracing::info!(warehouse_id = %input.warehouse_id, items = records.len(), "Initial inventory loaded");
        Ok(records)
    }

    /// Import `product_code,quantity,purchase_price` rows into a warehouse.
    ///
    /// Each row commits on its own; failed rows are reported as `row N: message`
    /// with N counted from the first data row.
    pub async fn import_csv(&self, actor: &AuthUser, warehouse_id: Uuid, data: &[u8]) -> AppResult<ImportReport> {
        actor.require_admin()?;

        let warehouse_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;
        if !warehouse_exists {
            return Err(AppError::not_found("Warehouse"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let mut report = ImportReport::default();
        for (index, row) in reader.deserialize::<CsvStockRow>().enumerate() {
            let row_number = index + 1;
            let result = match row {
                Ok(row) => self.import_row(warehouse_id, &row).await,
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(()) => report.imported += 1,
                Err(message) => report.errors.push(format!("row {}: {}", row_number, message)),
            }
        }

        tracing::info!(
            %warehouse_id,
            imported = report.imported,
            failed = report.errors.len(),
            "CSV stock import finished"
        );
        Ok(report)
    }

    async fn import_row(&self, warehouse_id: Uuid, row: &CsvStockRow) -> Result<(), String> {
        let quantity = parse_decimal("quantity", &row.quantity)?;
        let purchase_price = match row.purchase_price.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => Some(parse_decimal("purchase_price", p)?),
            None => None,
        };

        let run = async {
            let mut tx = self.db.begin().await?;
            let product_id: Uuid = sqlx::query_scalar("SELECT id FROM products WHERE code = $1")
                .bind(row.product_code.trim())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {}", row.product_code)))?;
            receive_stock_tx(&mut tx, warehouse_id, product_id, quantity, purchase_price, movement_tag::CSV_IMPORT)
                .await?;
            tx.commit().await?;
            Ok::<(), AppError>(())
        };

        run.await.map_err(|e| e.to_string())
    }
}
