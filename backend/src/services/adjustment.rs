//! Inventory adjustment engine
//!
//! Batched manual stock corrections. Every mutation runs in one transaction
//! and goes through `movement::apply_stock_ops`, so an insufficient-stock
//! failure on any line rolls the whole adjustment back.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    code_prefix, movement_tag, plan_adjustment_reversal, plan_adjustment_update, AdjustmentDirection,
    AdjustmentLine, AdjustmentLineInput, InventoryAdjustment, StockOp, StockRecord,
};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::movement::{apply_stock_op, apply_stock_ops};
use super::next_code;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AdjustmentDetail, AdjustmentLineView, AdjustmentSummary};

/// Adjustment service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
    offset: FixedOffset,
}

/// Input for creating an adjustment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdjustmentInput {
    pub warehouse_id: Uuid,
    /// Defaults to today in the business timezone
    pub adjusted_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub memo: Option<String>,
    pub lines: Vec<AdjustmentLineInput>,
}

/// Input for editing an adjustment; `lines` is the complete new line set
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdjustmentInput {
    pub adjusted_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub memo: Option<String>,
    pub lines: Vec<AdjustmentLineInput>,
}

/// Single-product correction against the default warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct ModifyUnitStockInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    #[validate(length(max = 200))]
    pub memo: Option<String>,
    pub direction: AdjustmentDirection,
}

const ADJUSTMENT_COLUMNS: &str = "id, seq, code, warehouse_id, user_id, adjusted_on, memo, created_at";

const LINE_COLUMNS: &str = "id, adjustment_id, product_id, quantity, unit_of_measure, direction, position";

impl AdjustmentService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            offset: config.business.offset(),
        }
    }

    /// Create an adjustment and apply every line to the ledger
    pub async fn create_adjustment(&self, actor: &AuthUser, input: CreateAdjustmentInput) -> AppResult<AdjustmentDetail> {
        input.validate()?;
        shared::validate_adjustment_lines(&input.lines).map_err(|m| AppError::validation("lines", m))?;

        let adjusted_on = input
            .adjusted_on
            .unwrap_or_else(|| shared::business_today(self.offset));

        let mut tx = self.db.begin().await?;

        let warehouse_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(input.warehouse_id)
            .fetch_one(&mut *tx)
            .await?;
        if !warehouse_exists {
            return Err(AppError::not_found("Warehouse"));
        }

        let (seq, code) = next_code(&mut tx, "adjustment_seq", code_prefix::ADJUSTMENT).await?;
        let adjustment = sqlx::query_as::<_, InventoryAdjustment>(&format!(
            r#"
            INSERT INTO inventory_adjustments (seq, code, warehouse_id, user_id, adjusted_on, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ADJUSTMENT_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(input.warehouse_id)
        .bind(actor.user_id)
        .bind(adjusted_on)
        .bind(&input.memo)
        .fetch_one(&mut *tx)
        .await?;

        let ops: Vec<StockOp> = input
            .lines
            .iter()
            .map(|l| l.stock_op(adjustment.warehouse_id, movement_tag::ADJUSTMENT))
            .collect();
        apply_stock_ops(&mut tx, &ops).await?;

        for (position, line) in input.lines.iter().enumerate() {
            insert_line(&mut tx, adjustment.id, line, position as i32).await?;
        }

        tx.commit().await?;

        tracing::info!(
            adjustment_id = %adjustment.id,
            code = %adjustment.code,
            warehouse_id = %adjustment.warehouse_id,
            lines = input.lines.len(),
            "Inventory adjustment created"
        );

        self.get_adjustment(adjustment.id).await
    }

    /// Replace an adjustment's lines, applying only the stock difference
    pub async fn update_adjustment(
        &self,
        actor: &AuthUser,
        adjustment_id: Uuid,
        input: UpdateAdjustmentInput,
    ) -> AppResult<AdjustmentDetail> {
        input.validate()?;
        shared::validate_adjustment_lines(&input.lines).map_err(|m| AppError::validation("lines", m))?;

        let mut tx = self.db.begin().await?;

        let adjustment = lock_adjustment(&mut tx, adjustment_id).await?;
        actor.require_owner_or_admin(adjustment.user_id)?;

        let existing = load_lines(&mut tx, adjustment.id).await?;
        let plan = plan_adjustment_update(adjustment.warehouse_id, &existing, &input.lines);

        apply_stock_ops(&mut tx, &plan.stock_ops).await?;

        for line_id in &plan.deleted_lines {
            sqlx::query("DELETE FROM adjustment_lines WHERE id = $1")
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
        }

        for update in &plan.updated_lines {
            sqlx::query(
                "UPDATE adjustment_lines SET quantity = $2, direction = $3, unit_of_measure = $4 WHERE id = $1",
            )
            .bind(update.line_id)
            .bind(update.quantity)
            .bind(update.direction)
            .bind(&update.unit_of_measure)
            .execute(&mut *tx)
            .await?;
        }

        let next_position = existing.iter().map(|l| l.position + 1).max().unwrap_or(0);
        for (i, line) in plan.new_lines.iter().enumerate() {
            insert_line(&mut tx, adjustment.id, line, next_position + i as i32).await?;
        }

        sqlx::query(
            r#"
            UPDATE inventory_adjustments
            SET adjusted_on = COALESCE($2, adjusted_on), memo = COALESCE($3, memo)
            WHERE id = $1
            "#,
        )
        .bind(adjustment.id)
        .bind(input.adjusted_on)
        .bind(&input.memo)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            adjustment_id = %adjustment.id,
            code = %adjustment.code,
            stock_ops = plan.stock_ops.len(),
            "Inventory adjustment updated"
        );

        self.get_adjustment(adjustment.id).await
    }

    /// Undo every line of an adjustment and delete it
    pub async fn delete_adjustment(&self, actor: &AuthUser, adjustment_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let adjustment = lock_adjustment(&mut tx, adjustment_id).await?;
        actor.require_owner_or_admin(adjustment.user_id)?;

        let lines = load_lines(&mut tx, adjustment.id).await?;
        apply_stock_ops(&mut tx, &plan_adjustment_reversal(adjustment.warehouse_id, &lines)).await?;

        sqlx::query("DELETE FROM adjustment_lines WHERE adjustment_id = $1")
            .bind(adjustment.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM inventory_adjustments WHERE id = $1")
            .bind(adjustment.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(adjustment_id = %adjustment.id, code = %adjustment.code, "Inventory adjustment deleted");
        Ok(())
    }

    /// Adjust one product in the default warehouse without persisting a header
    pub async fn modify_unit_stock(&self, actor: &AuthUser, input: ModifyUnitStockInput) -> AppResult<StockRecord> {
        input.validate()?;
        shared::validate_positive_quantity(input.quantity).map_err(|m| AppError::validation("quantity", m))?;

        let mut tx = self.db.begin().await?;

        let warehouse_id: Uuid = sqlx::query_scalar("SELECT id FROM warehouses ORDER BY created_at, id LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Warehouse"))?;

        let description = input
            .memo
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(movement_tag::ADJUSTMENT);

        let op = StockOp {
            warehouse_id,
            product_id: input.product_id,
            direction: input.direction.movement(),
            quantity: input.quantity,
            description: description.to_string(),
        };
        let record = apply_stock_op(&mut tx, &op).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %actor.user_id,
            product_id = %input.product_id,
            warehouse_id = %warehouse_id,
            quantity = %input.quantity,
            direction = ?input.direction,
            "Unit stock modified"
        );
        Ok(record)
    }

    /// Get one adjustment with enriched lines
    pub async fn get_adjustment(&self, adjustment_id: Uuid) -> AppResult<AdjustmentDetail> {
        let summary = sqlx::query_as::<_, AdjustmentSummary>(&format!(
            "{} WHERE a.id = $1",
            SUMMARY_SELECT
        ))
        .bind(adjustment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Adjustment"))?;

        let mut lines = self.line_views(&[summary.adjustment.id]).await?;
        Ok(AdjustmentDetail {
            lines: lines.remove(&summary.adjustment.id).unwrap_or_default(),
            summary,
        })
    }

    /// List adjustments, newest first
    pub async fn list_adjustments(&self) -> AppResult<Vec<AdjustmentDetail>> {
        let summaries = sqlx::query_as::<_, AdjustmentSummary>(&format!(
            "{} ORDER BY a.created_at DESC",
            SUMMARY_SELECT
        ))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = summaries.iter().map(|s| s.adjustment.id).collect();
        let mut lines = self.line_views(&ids).await?;

        Ok(summaries
            .into_iter()
            .map(|summary| AdjustmentDetail {
                lines: lines.remove(&summary.adjustment.id).unwrap_or_default(),
                summary,
            })
            .collect())
    }

    async fn line_views(&self, adjustment_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<AdjustmentLineView>>> {
        let rows = sqlx::query_as::<_, AdjustmentLineView>(
            r#"
            SELECT l.id, l.adjustment_id, l.product_id, l.quantity, l.unit_of_measure, l.direction, l.position,
                   p.code AS product_code, p.name AS product_name, s.quantity_on_hand AS current_stock
            FROM adjustment_lines l
            JOIN inventory_adjustments a ON a.id = l.adjustment_id
            LEFT JOIN products p ON p.id = l.product_id
            LEFT JOIN stock_records s ON s.product_id = l.product_id AND s.warehouse_id = a.warehouse_id
            WHERE l.adjustment_id = ANY($1)
            ORDER BY l.position
            "#,
        )
        .bind(adjustment_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<AdjustmentLineView>> = HashMap::new();
        for row in rows {
            grouped.entry(row.line.adjustment_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT a.id, a.seq, a.code, a.warehouse_id, a.user_id, a.adjusted_on, a.memo, a.created_at,
           w.name AS warehouse_name, u.full_name AS user_name
    FROM inventory_adjustments a
    LEFT JOIN warehouses w ON w.id = a.warehouse_id
    LEFT JOIN users u ON u.id = a.user_id
"#;

async fn lock_adjustment(conn: &mut PgConnection, adjustment_id: Uuid) -> AppResult<InventoryAdjustment> {
    sqlx::query_as::<_, InventoryAdjustment>(&format!(
        "SELECT {} FROM inventory_adjustments WHERE id = $1 FOR UPDATE",
        ADJUSTMENT_COLUMNS
    ))
    .bind(adjustment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Adjustment"))
}

async fn load_lines(conn: &mut PgConnection, adjustment_id: Uuid) -> AppResult<Vec<AdjustmentLine>> {
    let lines = sqlx::query_as::<_, AdjustmentLine>(&format!(
        "SELECT {} FROM adjustment_lines WHERE adjustment_id = $1 ORDER BY position",
        LINE_COLUMNS
    ))
    .bind(adjustment_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

async fn insert_line(
    conn: &mut PgConnection,
    adjustment_id: Uuid,
    line: &AdjustmentLineInput,
    position: i32,
) -> AppResult<AdjustmentLine> {
    let line = sqlx::query_as::<_, AdjustmentLine>(&format!(
        r#"
        INSERT INTO adjustment_lines (adjustment_id, product_id, quantity, unit_of_measure, direction, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        LINE_COLUMNS
    ))
    .bind(adjustment_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(&line.unit_of_measure)
    .bind(line.direction)
    .bind(position)
    .fetch_one(&mut *conn)
    .await?;
    Ok(line)
}
