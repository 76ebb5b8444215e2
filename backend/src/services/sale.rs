//! Sale transaction manager
//!
//! Lifecycle `Active ⇄ Voided → Deleted`. While a sale is active its line
//! quantities are out of stock; voiding puts them back and restoring takes
//! them out again. Each operation is one transaction.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    code_prefix, movement_tag, ChartPeriod, ChartPoint, DateRange, PaymentMethod, Sale, SaleLine, SaleLineInput,
    SaleWithLines, StockOp, TopProduct,
};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::cash_register::ensure_session_open;
use super::catalog::register_client_if_missing_tx;
use super::movement::apply_stock_op;
use super::next_code;
use super::notification::Notifier;
use super::stock_ledger::find_record_tx;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    offset: FixedOffset,
    notifier: Notifier,
}

/// Sale header and lines, used for both create and edit
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaleInput {
    /// Defaults to now on create, unchanged on edit
    pub sold_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 200))]
    pub buyer_name: String,
    pub discount: Option<Decimal>,
    pub payment_method: PaymentMethod,
    pub cash_amount: Option<Decimal>,
    pub electronic_amount: Option<Decimal>,
    pub cash_register_session_id: Option<Uuid>,
    pub lines: Vec<SaleLineInput>,
}

/// Header amounts derived from a validated input
struct PricedSale {
    subtotal: Decimal,
    discount: Decimal,
    total: Decimal,
    cash_amount: Option<Decimal>,
    electronic_amount: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    #[sqlx(flatten)]
    sale: Sale,
    seller_name: Option<String>,
}

pub(crate) const SALE_COLUMNS: &str = "id, seq, code, sold_at, edited_at, voided_at, voided_by, seller_id, buyer_name, \
     active, subtotal, discount, total, payment_method, cash_amount, electronic_amount, cash_register_session_id, created_at";

const LINE_COLUMNS: &str =
    "id, sale_id, stock_record_id, product_name, brand, unit_price, quantity, unit_of_measure, subtotal, position";

fn price_sale(input: &SaleInput) -> AppResult<PricedSale> {
    input.validate()?;
    shared::validate_sale_lines(&input.lines).map_err(|m| AppError::validation("lines", m))?;

    let totals = shared::compute_sale_totals(&input.lines, input.discount.unwrap_or_default())
        .map_err(|m| AppError::validation("discount", m))?;
    let (cash_amount, electronic_amount) = shared::resolve_payment_split(
        input.payment_method,
        totals.total,
        input.cash_amount,
        input.electronic_amount,
    )
    .map_err(|m| AppError::validation("payment_method", m))?;

    Ok(PricedSale {
        subtotal: totals.subtotal,
        discount: totals.discount,
        total: totals.total,
        cash_amount,
        electronic_amount,
    })
}

impl SaleService {
    pub fn new(db: PgPool, config: &Config, notifier: Notifier) -> Self {
        Self {
            db,
            offset: config.business.offset(),
            notifier,
        }
    }

    /// Create a sale and take its lines out of stock
    pub async fn create_sale(&self, actor: &AuthUser, input: SaleInput) -> AppResult<SaleWithLines> {
        let priced = price_sale(&input)?;

        let mut tx = self.db.begin().await?;

        if let Some(session_id) = input.cash_register_session_id {
            ensure_session_open(&mut tx, session_id).await?;
        }

        let (seq, code) = next_code(&mut tx, "sale_seq", code_prefix::SALE).await?;
        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales
                (seq, code, sold_at, seller_id, buyer_name, subtotal, discount, total,
                 payment_method, cash_amount, electronic_amount, cash_register_session_id)
            VALUES ($1, $2, COALESCE($3, NOW()), $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(input.sold_at)
        .bind(actor.user_id)
        .bind(input.buyer_name.trim())
        .bind(priced.subtotal)
        .bind(priced.discount)
        .bind(priced.total)
        .bind(input.payment_method)
        .bind(priced.cash_amount)
        .bind(priced.electronic_amount)
        .bind(input.cash_register_session_id)
        .fetch_one(&mut *tx)
        .await?;

        let tag = movement_tag::sale(&sale.code);
        for (position, line) in input.lines.iter().enumerate() {
            sell_line_tx(&mut tx, sale.id, line, position as i32, &tag).await?;
        }

        register_client_if_missing_tx(&mut tx, &sale.buyer_name).await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            code = %sale.code,
            total = %sale.total,
            lines = input.lines.len(),
            "Sale created"
        );
        self.notifier.sale_created(&sale);

        self.get_sale(actor, sale.id).await
    }

    /// Replace an active sale's header and lines, moving only the stock that changed
    pub async fn update_sale(&self, actor: &AuthUser, sale_id: Uuid, input: SaleInput) -> AppResult<SaleWithLines> {
        let priced = price_sale(&input)?;

        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        actor.require_owner_or_admin(sale.seller_id)?;
        sale.status().ensure_editable()?;

        if let Some(session_id) = input.cash_register_session_id {
            if sale.cash_register_session_id != Some(session_id) {
                ensure_session_open(&mut tx, session_id).await?;
            }
        }

        let existing = load_lines(&mut tx, sale.id).await?;
        let diff = shared::diff_sale_lines(&existing, &input.lines);
        let tag = movement_tag::sale_edited(&sale.code);

        for old in &diff.removed {
            return_line_tx(&mut tx, old, &tag).await?;
            delete_line(&mut tx, old.id).await?;
        }

        for (old, new) in &diff.changed {
            return_line_tx(&mut tx, old, &tag).await?;
            delete_line(&mut tx, old.id).await?;
            sell_line_tx(&mut tx, sale.id, new, old.position, &tag).await?;
        }

        for (old, new) in &diff.repriced {
            sqlx::query("UPDATE sale_lines SET unit_price = $2, unit_of_measure = $3, subtotal = $4 WHERE id = $1")
                .bind(old.id)
                .bind(new.unit_price)
                .bind(&new.unit_of_measure)
                .bind(new.subtotal())
                .execute(&mut *tx)
                .await?;
        }

        let next_position = existing.iter().map(|l| l.position + 1).max().unwrap_or(0);
        for (i, new) in diff.added.iter().enumerate() {
            sell_line_tx(&mut tx, sale.id, new, next_position + i as i32, &tag).await?;
        }

        sqlx::query(
            r#"
            UPDATE sales SET
                sold_at = COALESCE($2, sold_at),
                buyer_name = $3,
                subtotal = $4,
                discount = $5,
                total = $6,
                payment_method = $7,
                cash_amount = $8,
                electronic_amount = $9,
                cash_register_session_id = COALESCE($10, cash_register_session_id),
                edited_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(sale.id)
        .bind(input.sold_at)
        .bind(input.buyer_name.trim())
        .bind(priced.subtotal)
        .bind(priced.discount)
        .bind(priced.total)
        .bind(input.payment_method)
        .bind(priced.cash_amount)
        .bind(priced.electronic_amount)
        .bind(input.cash_register_session_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            code = %sale.code,
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            added = diff.added.len(),
            "Sale updated"
        );

        self.get_sale(actor, sale.id).await
    }

    /// Void an active sale, putting its stock back
    pub async fn void_sale(&self, actor: &AuthUser, sale_id: Uuid) -> AppResult<SaleWithLines> {
        let mut tx = self.db.begin().await?;

        let voided_by: String = sqlx::query_scalar("SELECT full_name FROM users WHERE id = $1")
            .bind(actor.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        actor.require_owner_or_admin(sale.seller_id)?;
        if let Err(e) = sale.status().void() {
            tracing::warn!(sale_id = %sale.id, code = %sale.code, "Rejected void: {}", e);
            return Err(e.into());
        }

        for line in load_lines(&mut tx, sale.id).await? {
            return_line_tx(&mut tx, &line, movement_tag::SALE_VOIDED).await?;
        }

        sqlx::query("UPDATE sales SET active = FALSE, voided_at = NOW(), voided_by = $2 WHERE id = $1")
            .bind(sale.id)
            .bind(&voided_by)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, code = %sale.code, voided_by = %voided_by, "Sale voided");
        self.get_sale(actor, sale.id).await
    }

    /// Restore a voided sale, taking its stock out again
    pub async fn restore_sale(&self, actor: &AuthUser, sale_id: Uuid) -> AppResult<SaleWithLines> {
        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        actor.require_owner_or_admin(sale.seller_id)?;
        if let Err(e) = sale.status().restore() {
            tracing::warn!(sale_id = %sale.id, code = %sale.code, "Rejected restore: {}", e);
            return Err(e.into());
        }

        for line in load_lines(&mut tx, sale.id).await? {
            let record_id = line
                .stock_record_id
                .ok_or_else(|| AppError::not_found(format!("Stock record for {}", line.product_name)))?;
            let record = find_record_tx(&mut tx, record_id).await?;
            apply_stock_op(
                &mut tx,
                &StockOp::egress(record.warehouse_id, record.product_id, line.quantity, movement_tag::SALE_RESTORED),
            )
            .await?;
        }

        sqlx::query("UPDATE sales SET active = TRUE, voided_at = NULL, voided_by = NULL WHERE id = $1")
            .bind(sale.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, code = %sale.code, "Sale restored");
        self.get_sale(actor, sale.id).await
    }

    /// Delete a voided sale and its lines
    pub async fn delete_sale(&self, actor: &AuthUser, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        actor.require_owner_or_admin(sale.seller_id)?;
        delete_sale_tx(&mut tx, &sale).await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, code = %sale.code, "Sale deleted");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_sale(&self, actor: &AuthUser, sale_id: Uuid) -> AppResult<SaleWithLines> {
        let row = sqlx::query_as::<_, SaleRow>(&format!("{} WHERE s.id = $1", sale_select()))
            .bind(sale_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Sale"))?;
        actor.require_owner_or_admin(row.sale.seller_id)?;

        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {} FROM sale_lines WHERE sale_id = $1 ORDER BY position",
            LINE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleWithLines {
            sale: row.sale,
            seller_name: row.seller_name,
            lines,
        })
    }

    /// Sales in an optional local date range, newest first; non-admins see their own
    pub async fn list_sales(&self, actor: &AuthUser, range: Option<DateRange>) -> AppResult<Vec<SaleWithLines>> {
        let bounds = range.map(|r| r.utc_bounds(self.offset));
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            {}
            WHERE ($1::timestamptz IS NULL OR s.sold_at >= $1)
              AND ($2::timestamptz IS NULL OR s.sold_at < $2)
              AND ($3::uuid IS NULL OR s.seller_id = $3)
            ORDER BY s.sold_at DESC
            "#,
            sale_select()
        ))
        .bind(bounds.map(|b| b.0))
        .bind(bounds.map(|b| b.1))
        .bind(actor.scope())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.sale.id).collect();
        let mut lines = self.lines_by_sale(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| SaleWithLines {
                lines: lines.remove(&row.sale.id).unwrap_or_default(),
                sale: row.sale,
                seller_name: row.seller_name,
            })
            .collect())
    }

    /// Number of sales, voided ones included
    pub async fn count_sales(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Products ranked by quantity across all sale line history
    pub async fn top_products(&self, limit: i64) -> AppResult<Vec<TopProduct>> {
        let products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT sr.product_id, l.product_name, SUM(l.quantity) AS quantity_sold
            FROM sale_lines l
            LEFT JOIN stock_records sr ON sr.id = l.stock_record_id
            GROUP BY sr.product_id, l.product_name
            ORDER BY quantity_sold DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn latest_sales(&self, limit: i64) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales ORDER BY sold_at DESC LIMIT $1",
            SALE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(sales)
    }

    /// Active sales bucketed for the dashboard chart
    pub async fn chart(&self, period: ChartPeriod) -> AppResult<Vec<ChartPoint>> {
        let today = shared::business_today(self.offset);
        let (start, end) = period.range(today).utc_bounds(self.offset);

        let points: Vec<(DateTime<Utc>, Decimal)> =
            sqlx::query_as("SELECT sold_at, total FROM sales WHERE active AND sold_at >= $1 AND sold_at < $2")
                .bind(start)
                .bind(end)
                .fetch_all(&self.db)
                .await?;

        Ok(shared::chart_series(period, today, self.offset, &points))
    }

    async fn lines_by_sale(&self, sale_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<SaleLine>>> {
        let rows = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {} FROM sale_lines WHERE sale_id = ANY($1) ORDER BY position",
            LINE_COLUMNS
        ))
        .bind(sale_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<SaleLine>> = HashMap::new();
        for line in rows {
            grouped.entry(line.sale_id).or_default().push(line);
        }
        Ok(grouped)
    }
}

fn sale_select() -> String {
    let columns: Vec<String> = SALE_COLUMNS.split(", ").map(|c| format!("s.{}", c)).collect();
    format!(
        "SELECT {}, u.full_name AS seller_name FROM sales s LEFT JOIN users u ON u.id = s.seller_id",
        columns.join(", ")
    )
}

async fn lock_sale(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<Sale> {
    sqlx::query_as::<_, Sale>(&format!("SELECT {} FROM sales WHERE id = $1 FOR UPDATE", SALE_COLUMNS))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Sale"))
}

async fn load_lines(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<Vec<SaleLine>> {
    let lines = sqlx::query_as::<_, SaleLine>(&format!(
        "SELECT {} FROM sale_lines WHERE sale_id = $1 ORDER BY position",
        LINE_COLUMNS
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

async fn delete_line(conn: &mut PgConnection, line_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM sale_lines WHERE id = $1")
        .bind(line_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a line with denormalized product data and take its quantity out of stock
async fn sell_line_tx(
    conn: &mut PgConnection,
    sale_id: Uuid,
    line: &SaleLineInput,
    position: i32,
    description: &str,
) -> AppResult<SaleLine> {
    let record = find_record_tx(conn, line.stock_record_id).await?;
    let (product_name, brand): (String, Option<String>) =
        sqlx::query_as("SELECT name, brand FROM products WHERE id = $1")
            .bind(record.product_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

    apply_stock_op(
        conn,
        &StockOp::egress(record.warehouse_id, record.product_id, line.quantity, description),
    )
    .await?;

    let line = sqlx::query_as::<_, SaleLine>(&format!(
        r#"
        INSERT INTO sale_lines
            (sale_id, stock_record_id, product_name, brand, unit_price, quantity, unit_of_measure, subtotal, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        LINE_COLUMNS
    ))
    .bind(sale_id)
    .bind(record.id)
    .bind(&product_name)
    .bind(&brand)
    .bind(line.unit_price)
    .bind(line.quantity)
    .bind(&line.unit_of_measure)
    .bind(line.subtotal())
    .bind(position)
    .fetch_one(&mut *conn)
    .await?;

    Ok(line)
}

/// Put a line's quantity back into its stock record
async fn return_line_tx(conn: &mut PgConnection, line: &SaleLine, description: &str) -> AppResult<()> {
    let Some(record_id) = line.stock_record_id else {
        tracing::warn!(line_id = %line.id, product = %line.product_name, "Stock record gone, nothing to return");
        return Ok(());
    };
    let record = find_record_tx(conn, record_id).await?;
    apply_stock_op(
        conn,
        &StockOp::ingress(record.warehouse_id, record.product_id, line.quantity, description),
    )
    .await?;
    Ok(())
}

/// Delete a sale inside the caller's transaction; only voided sales may go
pub(crate) async fn delete_sale_tx(conn: &mut PgConnection, sale: &Sale) -> AppResult<()> {
    if let Err(e) = sale.status().ensure_deletable() {
        tracing::warn!(sale_id = %sale.id, code = %sale.code, "Rejected delete: {}", e);
        return Err(e.into());
    }
    sqlx::query("DELETE FROM sales WHERE id = $1")
        .bind(sale.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
