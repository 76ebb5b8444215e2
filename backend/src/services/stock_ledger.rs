//! Stock ledger: quantity on hand per (warehouse, product)
//!
//! The `_tx` functions take the caller's connection so they join the caller's
//! transaction. Subtraction locks the stock row before checking sufficiency.

use rust_decimal::Decimal;
use shared::{StockError, StockRecord};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const STOCK_COLUMNS: &str =
    "id, warehouse_id, product_id, quantity_on_hand, last_purchase_price, updated_at";

/// Fail with NotFound unless both the warehouse and the product exist
pub async fn ensure_warehouse_and_product(conn: &mut PgConnection, warehouse_id: Uuid, product_id: Uuid) -> AppResult<()> {
    let (warehouse, product): (bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM warehouses WHERE id = $1),
            EXISTS (SELECT 1 FROM products WHERE id = $2)
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    if !warehouse {
        return Err(AppError::not_found("Warehouse"));
    }
    if !product {
        return Err(AppError::not_found("Product"));
    }
    Ok(())
}

/// Add `quantity` to the (warehouse, product) record, creating it on first use
pub async fn add_stock_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
) -> AppResult<StockRecord> {
    shared::check_quantity(quantity)?;
    ensure_warehouse_and_product(conn, warehouse_id, product_id).await?;

    let record = sqlx::query_as::<_, StockRecord>(&format!(
        r#"
        INSERT INTO stock_records (warehouse_id, product_id, quantity_on_hand)
        VALUES ($1, $2, $3)
        ON CONFLICT (warehouse_id, product_id) DO UPDATE
            SET quantity_on_hand = stock_records.quantity_on_hand + EXCLUDED.quantity_on_hand,
                updated_at = NOW()
        RETURNING {}
        "#,
        STOCK_COLUMNS
    ))
    .bind(warehouse_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

/// Remove `quantity` from an existing record; the record never goes negative
pub async fn subtract_stock_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
) -> AppResult<StockRecord> {
    let current = sqlx::query_as::<_, StockRecord>(&format!(
        "SELECT {} FROM stock_records WHERE warehouse_id = $1 AND product_id = $2 FOR UPDATE",
        STOCK_COLUMNS
    ))
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Stock record"))?;

    let remaining = match shared::subtract_quantity(current.quantity_on_hand, quantity) {
        Ok(remaining) => remaining,
        Err(StockError::Insufficient { available, requested }) => {
            let product: Option<String> = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;
            tracing::warn!(%warehouse_id, %product_id, %available, %requested, "Insufficient stock");
            return Err(AppError::InsufficientStock(format!(
                "{}: {} available, {} requested",
                product.unwrap_or_else(|| product_id.to_string()),
                available,
                requested
            )));
        }
        Err(err) => return Err(err.into()),
    };

    let record = sqlx::query_as::<_, StockRecord>(&format!(
        "UPDATE stock_records SET quantity_on_hand = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        STOCK_COLUMNS
    ))
    .bind(current.id)
    .bind(remaining)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

/// Record the latest purchase price of a stock record
pub async fn set_last_purchase_price_tx(conn: &mut PgConnection, stock_record_id: Uuid, price: Decimal) -> AppResult<()> {
    sqlx::query("UPDATE stock_records SET last_purchase_price = $2 WHERE id = $1")
        .bind(stock_record_id)
        .bind(price)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Load a stock record by id
pub async fn find_record_tx(conn: &mut PgConnection, stock_record_id: Uuid) -> AppResult<StockRecord> {
    sqlx::query_as::<_, StockRecord>(&format!("SELECT {} FROM stock_records WHERE id = $1", STOCK_COLUMNS))
        .bind(stock_record_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Stock record"))
}
