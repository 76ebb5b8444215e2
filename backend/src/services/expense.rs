//! Expense service

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{code_prefix, DateRange, Expense, ExpenseKind, ExpensePaymentMethod, ExpenseView};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::cash_register::ensure_session_open;
use super::next_code;
use super::notification::Notifier;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Expense service
#[derive(Clone)]
pub struct ExpenseService {
    db: PgPool,
    offset: FixedOffset,
    notifier: Notifier,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseInput {
    pub category_id: Option<Uuid>,
    pub kind: Option<ExpenseKind>,
    #[validate(length(min = 1, max = 300))]
    pub memo: String,
    #[validate(length(max = 1000))]
    pub detail: Option<String>,
    pub spent_at: Option<DateTime<Utc>>,
    pub amount: Decimal,
    pub payment_method: ExpensePaymentMethod,
    pub cash_register_session_id: Option<Uuid>,
}

/// Expense update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseInput {
    pub category_id: Option<Uuid>,
    pub kind: Option<ExpenseKind>,
    #[validate(length(min = 1, max = 300))]
    pub memo: Option<String>,
    #[validate(length(max = 1000))]
    pub detail: Option<String>,
    pub spent_at: Option<DateTime<Utc>>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<ExpensePaymentMethod>,
}

pub(crate) const EXPENSE_COLUMNS: &str = "id, seq, code, user_id, category_id, kind, memo, detail, spent_at, amount, \
     payment_method, cash_register_session_id, created_at";

/// Expense rows joined with user and category names
pub(crate) const EXPENSE_VIEW_SELECT: &str = r#"
    SELECT e.id, e.seq, e.code, e.user_id, e.category_id, e.kind, e.memo, e.detail, e.spent_at, e.amount,
           e.payment_method, e.cash_register_session_id, e.created_at,
           u.full_name AS user_name, c.name AS category_name
    FROM expenses e
    LEFT JOIN users u ON u.id = e.user_id
    LEFT JOIN expense_categories c ON c.id = e.category_id
"#;

impl ExpenseService {
    pub fn new(db: PgPool, config: &Config, notifier: Notifier) -> Self {
        Self {
            db,
            offset: config.business.offset(),
            notifier,
        }
    }

    pub async fn create_expense(&self, actor: &AuthUser, input: CreateExpenseInput) -> AppResult<Expense> {
        input.validate()?;
        shared::validate_non_negative_amount(input.amount).map_err(|m| AppError::validation("amount", m))?;

        let mut tx = self.db.begin().await?;

        if let Some(session_id) = input.cash_register_session_id {
            ensure_session_open(&mut tx, session_id).await?;
        }

        let (seq, code) = next_code(&mut tx, "expense_seq", code_prefix::EXPENSE).await?;
        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses
                (seq, code, user_id, category_id, kind, memo, detail, spent_at, amount,
                 payment_method, cash_register_session_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()), $9, $10, $11)
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(actor.user_id)
        .bind(input.category_id)
        .bind(input.kind.unwrap_or(ExpenseKind::Variable))
        .bind(input.memo.trim())
        .bind(&input.detail)
        .bind(input.spent_at)
        .bind(shared::round2(input.amount))
        .bind(input.payment_method)
        .bind(input.cash_register_session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(expense_id = %expense.id, code = %expense.code, amount = %expense.amount, "Expense created");
        self.notifier.expense_created(&expense);

        Ok(expense)
    }

    /// Expenses in an optional local date range, newest first; non-admins see their own
    pub async fn list_expenses(&self, actor: &AuthUser, range: Option<DateRange>) -> AppResult<Vec<ExpenseView>> {
        let bounds = range.map(|r| r.utc_bounds(self.offset));
        let expenses = sqlx::query_as::<_, ExpenseView>(&format!(
            r#"
            {}
            WHERE ($1::timestamptz IS NULL OR e.spent_at >= $1)
              AND ($2::timestamptz IS NULL OR e.spent_at < $2)
              AND ($3::uuid IS NULL OR e.user_id = $3)
            ORDER BY e.spent_at DESC
            "#,
            EXPENSE_VIEW_SELECT
        ))
        .bind(bounds.map(|b| b.0))
        .bind(bounds.map(|b| b.1))
        .bind(actor.scope())
        .fetch_all(&self.db)
        .await?;
        Ok(expenses)
    }

    pub async fn get_expense(&self, actor: &AuthUser, expense_id: Uuid) -> AppResult<ExpenseView> {
        let expense = sqlx::query_as::<_, ExpenseView>(&format!("{} WHERE e.id = $1", EXPENSE_VIEW_SELECT))
            .bind(expense_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Expense"))?;
        actor.require_owner_or_admin(expense.expense.user_id)?;
        Ok(expense)
    }

    pub async fn update_expense(&self, actor: &AuthUser, expense_id: Uuid, input: UpdateExpenseInput) -> AppResult<Expense> {
        input.validate()?;
        if let Some(amount) = input.amount {
            shared::validate_non_negative_amount(amount).map_err(|m| AppError::validation("amount", m))?;
        }

        let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM expenses WHERE id = $1")
            .bind(expense_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Expense"))?;
        actor.require_owner_or_admin(owner)?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses SET
                category_id = COALESCE($2, category_id),
                kind = COALESCE($3, kind),
                memo = COALESCE($4, memo),
                detail = COALESCE($5, detail),
                spent_at = COALESCE($6, spent_at),
                amount = COALESCE($7, amount),
                payment_method = COALESCE($8, payment_method)
            WHERE id = $1
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .bind(input.category_id)
        .bind(input.kind)
        .bind(input.memo.as_deref().map(str::trim))
        .bind(&input.detail)
        .bind(input.spent_at)
        .bind(input.amount.map(shared::round2))
        .bind(input.payment_method)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(expense_id = %expense.id, code = %expense.code, "Expense updated");
        Ok(expense)
    }

    pub async fn delete_expense(&self, actor: &AuthUser, expense_id: Uuid) -> AppResult<()> {
        let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM expenses WHERE id = $1")
            .bind(expense_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Expense"))?;
        actor.require_owner_or_admin(owner)?;

        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%expense_id, "Expense deleted");
        Ok(())
    }

    pub async fn count_expenses(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
