//! Movement log: append-only audit trail of stock changes

use rust_decimal::Decimal;
use shared::{DateRange, MovementDirection, StockMovement, StockOp, StockRecord};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::stock_ledger::{add_stock_tx, subtract_stock_tx};
use crate::error::{AppError, AppResult};

const MOVEMENT_COLUMNS: &str =
    "id, warehouse_id, product_id, warehouse_name, product_name, direction, quantity, description, created_at";

/// Default size of the latest-movements feed
pub const DEFAULT_LATEST_MOVEMENTS: i64 = 5;

/// Append a movement, copying the current warehouse and product names
pub async fn log_movement_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    direction: MovementDirection,
    quantity: Decimal,
    description: &str,
) -> AppResult<StockMovement> {
    sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements
            (warehouse_id, product_id, warehouse_name, product_name, direction, quantity, description)
        SELECT w.id, p.id, w.name, p.name, $3, $4, $5
        FROM warehouses w, products p
        WHERE w.id = $1 AND p.id = $2
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    ))
    .bind(warehouse_id)
    .bind(product_id)
    .bind(direction)
    .bind(quantity)
    .bind(description)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Warehouse or product"))
}

pub async fn log_ingress_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    description: &str,
) -> AppResult<StockMovement> {
    log_movement_tx(conn, warehouse_id, product_id, MovementDirection::Ingress, quantity, description).await
}

pub async fn log_egress_tx(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    description: &str,
) -> AppResult<StockMovement> {
    log_movement_tx(conn, warehouse_id, product_id, MovementDirection::Egress, quantity, description).await
}

/// Apply one planned operation: mutate the ledger and log the matching movement
pub async fn apply_stock_op(conn: &mut PgConnection, op: &StockOp) -> AppResult<StockRecord> {
    let record = match op.direction {
        MovementDirection::Ingress => {
            let record = add_stock_tx(conn, op.warehouse_id, op.product_id, op.quantity).await?;
            log_ingress_tx(conn, op.warehouse_id, op.product_id, op.quantity, &op.description).await?;
            record
        }
        MovementDirection::Egress => {
            let record = subtract_stock_tx(conn, op.warehouse_id, op.product_id, op.quantity).await?;
            log_egress_tx(conn, op.warehouse_id, op.product_id, op.quantity, &op.description).await?;
            record
        }
    };
    Ok(record)
}

/// Apply planned operations in order, stopping at the first failure
pub async fn apply_stock_ops(conn: &mut PgConnection, ops: &[StockOp]) -> AppResult<()> {
    for op in ops {
        apply_stock_op(conn, op).await?;
    }
    Ok(())
}

/// Read-only movement queries, newest first
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

impl MovementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Movements of one product, optionally limited to a local date range
    pub async fn by_product(
        &self,
        product_id: Uuid,
        range: Option<DateRange>,
        offset: chrono::FixedOffset,
    ) -> AppResult<Vec<StockMovement>> {
        let bounds = range.map(|r| r.utc_bounds(offset));
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE product_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .bind(bounds.map(|b| b.0))
        .bind(bounds.map(|b| b.1))
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }

    pub async fn latest(&self, limit: i64) -> AppResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements ORDER BY created_at DESC LIMIT $1",
            MOVEMENT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }

    pub async fn by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE warehouse_id = $1 ORDER BY created_at DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }

    pub async fn all(&self) -> AppResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements ORDER BY created_at DESC",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }
}
