//! Cash register sessions
//!
//! A session is open while `closed_at` is NULL. Closing aggregates the
//! session's sales and expenses per payment method into a stored snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    code_prefix, CashRegisterDetail, CashRegisterSession, CashRegisterSummary, CloseTotals, Expense, ExpenseAmount,
    ExpenseView, Sale, SaleAmounts, SaleScope, SessionStatus, TransitionError,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::expense::{EXPENSE_COLUMNS, EXPENSE_VIEW_SELECT};
use super::next_code;
use super::sale::{delete_sale_tx, SALE_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Cash register service
#[derive(Clone)]
pub struct CashRegisterService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionInput {
    #[serde(default)]
    pub opening_balance: Decimal,
}

const SESSION_COLUMNS: &str = "id, seq, code, user_id, opened_at, closed_at, opening_balance, cash_sales, \
     electronic_sales, cash_expenses, electronic_expenses, cash_close, electronic_close, net_close";

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.seq, c.code, c.user_id, c.opened_at, c.closed_at, c.opening_balance, c.cash_sales,
           c.electronic_sales, c.cash_expenses, c.electronic_expenses, c.cash_close, c.electronic_close,
           c.net_close, u.full_name AS user_name
    FROM cash_register_sessions c
    LEFT JOIN users u ON u.id = c.user_id
"#;

/// Fail unless the session exists and is still open
pub(crate) async fn ensure_session_open(conn: &mut PgConnection, session_id: Uuid) -> AppResult<()> {
    let closed_at: Option<Option<DateTime<Utc>>> =
        sqlx::query_scalar("SELECT closed_at FROM cash_register_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await?;
    match closed_at {
        None => Err(AppError::not_found("Cash register session")),
        Some(Some(_)) => Err(TransitionError::SessionNotOpen.into()),
        Some(None) => Ok(()),
    }
}

async fn lock_session(conn: &mut PgConnection, session_id: Uuid) -> AppResult<CashRegisterSession> {
    sqlx::query_as::<_, CashRegisterSession>(&format!(
        "SELECT {} FROM cash_register_sessions WHERE id = $1 FOR UPDATE",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Cash register session"))
}

async fn latest_session(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<CashRegisterSession>> {
    let session = sqlx::query_as::<_, CashRegisterSession>(&format!(
        "SELECT {} FROM cash_register_sessions WHERE user_id = $1 ORDER BY opened_at DESC, seq DESC LIMIT 1",
        SESSION_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(session)
}

/// Recompute the close snapshot from the session's sales and expenses and store it
async fn write_close_snapshot(
    conn: &mut PgConnection,
    session: &CashRegisterSession,
    scope: SaleScope,
) -> AppResult<CashRegisterSession> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {} FROM sales WHERE cash_register_session_id = $1",
        SALE_COLUMNS
    ))
    .bind(session.id)
    .fetch_all(&mut *conn)
    .await?;

    let expenses = sqlx::query_as::<_, Expense>(&format!(
        "SELECT {} FROM expenses WHERE cash_register_session_id = $1",
        EXPENSE_COLUMNS
    ))
    .bind(session.id)
    .fetch_all(&mut *conn)
    .await?;

    let sale_amounts: Vec<SaleAmounts> = sales.iter().map(SaleAmounts::from).collect();
    let expense_amounts: Vec<ExpenseAmount> = expenses.iter().map(ExpenseAmount::from).collect();
    let totals = CloseTotals::compute(session.opening_balance, scope, &sale_amounts, &expense_amounts);

    let closed = sqlx::query_as::<_, CashRegisterSession>(&format!(
        r#"
        UPDATE cash_register_sessions SET
            cash_sales = $2,
            electronic_sales = $3,
            cash_expenses = $4,
            electronic_expenses = $5,
            cash_close = $6,
            electronic_close = $7,
            net_close = $8,
            closed_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        SESSION_COLUMNS
    ))
    .bind(session.id)
    .bind(totals.cash_sales)
    .bind(totals.electronic_sales)
    .bind(totals.cash_expenses)
    .bind(totals.electronic_expenses)
    .bind(totals.cash_close)
    .bind(totals.electronic_close)
    .bind(totals.net_close)
    .fetch_one(&mut *conn)
    .await?;

    Ok(closed)
}

impl CashRegisterService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a new session for the actor
    pub async fn open(&self, actor: &AuthUser, input: OpenSessionInput) -> AppResult<CashRegisterSession> {
        shared::validate_non_negative_amount(input.opening_balance)
            .map_err(|m| AppError::validation("opening_balance", m))?;

        let mut tx = self.db.begin().await?;

        if let Some(latest) = latest_session(&mut tx, actor.user_id).await? {
            if latest.is_open() {
                tracing::warn!(session_id = %latest.id, user_id = %actor.user_id, "Rejected open: session still open");
                return Err(TransitionError::SessionAlreadyOpen.into());
            }
        }

        let (seq, code) = next_code(&mut tx, "cash_register_seq", code_prefix::CASH_REGISTER).await?;
        let session = sqlx::query_as::<_, CashRegisterSession>(&format!(
            r#"
            INSERT INTO cash_register_sessions (seq, code, user_id, opening_balance)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(actor.user_id)
        .bind(shared::round2(input.opening_balance))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(session_id = %session.id, code = %session.code, "Cash register opened");
        Ok(session)
    }

    /// Status of the user's most recent session
    pub async fn check_latest_status(&self, user_id: Uuid) -> AppResult<SessionStatus> {
        let mut conn = self.db.acquire().await?;
        let session = latest_session(&mut conn, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cash register session"))?;
        Ok(SessionStatus::of(&session))
    }

    /// Close an open session and store its totals; voided sales still count
    pub async fn close(&self, actor: &AuthUser, session_id: Uuid) -> AppResult<CashRegisterSession> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        actor.require_owner_or_admin(session.user_id)?;
        if let Err(e) = session.ensure_open() {
            tracing::warn!(session_id = %session.id, code = %session.code, "Rejected close: {}", e);
            return Err(e.into());
        }

        let closed = write_close_snapshot(&mut tx, &session, SaleScope::All).await?;
        tx.commit().await?;

        tracing::info!(
            session_id = %closed.id,
            code = %closed.code,
            cash_close = %closed.cash_close,
            electronic_close = %closed.electronic_close,
            net_close = %closed.net_close,
            "Cash register closed"
        );
        Ok(closed)
    }

    /// Recompute the close snapshot, open or closed, from active sales only
    pub async fn close_edit(&self, actor: &AuthUser, session_id: Uuid) -> AppResult<CashRegisterSession> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        actor.require_owner_or_admin(session.user_id)?;

        let closed = write_close_snapshot(&mut tx, &session, SaleScope::ActiveOnly).await?;
        tx.commit().await?;

        tracing::info!(session_id = %closed.id, code = %closed.code, net_close = %closed.net_close, "Cash register close recomputed");
        Ok(closed)
    }

    /// Reopen a closed session; its totals are kept until the next close
    pub async fn reopen(&self, actor: &AuthUser, session_id: Uuid) -> AppResult<CashRegisterSession> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        actor.require_owner_or_admin(session.user_id)?;
        if let Err(e) = session.ensure_closed() {
            tracing::warn!(session_id = %session.id, code = %session.code, "Rejected reopen: {}", e);
            return Err(e.into());
        }

        let other_open: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM cash_register_sessions WHERE user_id = $1 AND id <> $2 AND closed_at IS NULL)",
        )
        .bind(session.user_id)
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;
        if other_open {
            return Err(TransitionError::SessionAlreadyOpen.into());
        }

        let reopened = sqlx::query_as::<_, CashRegisterSession>(&format!(
            "UPDATE cash_register_sessions SET closed_at = NULL WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(session_id = %reopened.id, code = %reopened.code, "Cash register reopened");
        Ok(reopened)
    }

    /// Delete a session together with its (voided) sales; expenses are detached
    pub async fn remove(&self, actor: &AuthUser, session_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        actor.require_owner_or_admin(session.user_id)?;

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE cash_register_session_id = $1 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(session.id)
        .fetch_all(&mut *tx)
        .await?;

        if sales.iter().any(|s| s.active) {
            tracing::warn!(session_id = %session.id, code = %session.code, "Rejected remove: active sales linked");
            return Err(TransitionError::SessionHasActiveSales.into());
        }

        for sale in &sales {
            delete_sale_tx(&mut tx, sale).await?;
        }

        sqlx::query("UPDATE expenses SET cash_register_session_id = NULL WHERE cash_register_session_id = $1")
            .bind(session.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM cash_register_sessions WHERE id = $1")
            .bind(session.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(session_id = %session.id, code = %session.code, sales = sales.len(), "Cash register removed");
        Ok(())
    }

    /// Sessions newest first; non-admins see their own
    pub async fn list(&self, actor: &AuthUser) -> AppResult<Vec<CashRegisterSummary>> {
        let sessions = sqlx::query_as::<_, CashRegisterSummary>(&format!(
            "{} WHERE ($1::uuid IS NULL OR c.user_id = $1) ORDER BY c.opened_at DESC",
            SUMMARY_SELECT
        ))
        .bind(actor.scope())
        .fetch_all(&self.db)
        .await?;
        Ok(sessions)
    }

    /// One session with its sales and expenses
    pub async fn get(&self, actor: &AuthUser, session_id: Uuid) -> AppResult<CashRegisterDetail> {
        let summary = sqlx::query_as::<_, CashRegisterSummary>(&format!("{} WHERE c.id = $1", SUMMARY_SELECT))
            .bind(session_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Cash register session"))?;
        actor.require_owner_or_admin(summary.session.user_id)?;

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE cash_register_session_id = $1 ORDER BY sold_at",
            SALE_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        let expenses = sqlx::query_as::<_, ExpenseView>(&format!(
            "{} WHERE e.cash_register_session_id = $1 ORDER BY e.spent_at",
            EXPENSE_VIEW_SELECT
        ))
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        Ok(CashRegisterDetail {
            session: summary.session,
            user_name: summary.user_name,
            sales,
            expenses,
        })
    }
}
