//! Expense models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "expense_kind", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseKind {
    Variable,
    Fixed,
}

/// How an expense was paid. Expenses are never split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "expense_payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpensePaymentMethod {
    Cash,
    Electronic,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: ExpenseKind,
    pub memo: String,
    pub detail: Option<String>,
    pub spent_at: DateTime<Utc>,
    pub amount: Decimal,
    pub payment_method: ExpensePaymentMethod,
    pub cash_register_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Expense joined with its user and category names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExpenseView {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub expense: Expense,
    pub user_name: Option<String>,
    pub category_name: Option<String>,
}
