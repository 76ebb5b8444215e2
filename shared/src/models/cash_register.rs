//! Cash register sessions and close computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::{Expense, ExpensePaymentMethod, ExpenseView};
use super::sale::{PaymentMethod, Sale};
use crate::error::TransitionError;

/// A cash register session. `closed_at` is NULL while the session is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashRegisterSession {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub user_id: Uuid,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_balance: Decimal,
    pub cash_sales: Decimal,
    pub electronic_sales: Decimal,
    pub cash_expenses: Decimal,
    pub electronic_expenses: Decimal,
    pub cash_close: Decimal,
    pub electronic_close: Decimal,
    pub net_close: Decimal,
}

impl CashRegisterSession {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn ensure_open(&self) -> Result<(), TransitionError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransitionError::SessionAlreadyClosed)
        }
    }

    pub fn ensure_closed(&self) -> Result<(), TransitionError> {
        if self.is_open() {
            Err(TransitionError::SessionAlreadyOpen)
        } else {
            Ok(())
        }
    }
}

/// Status of a user's most recent session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionStatus {
    Open {
        session_id: Uuid,
        opened_at: DateTime<Utc>,
    },
    Closed,
}

impl SessionStatus {
    pub fn of(session: &CashRegisterSession) -> Self {
        if session.is_open() {
            SessionStatus::Open {
                session_id: session.id,
                opened_at: session.opened_at,
            }
        } else {
            SessionStatus::Closed
        }
    }
}

/// The money-relevant part of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleAmounts {
    pub active: bool,
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    pub cash_amount: Option<Decimal>,
    pub electronic_amount: Option<Decimal>,
}

impl From<&Sale> for SaleAmounts {
    fn from(sale: &Sale) -> Self {
        Self {
            active: sale.active,
            payment_method: sale.payment_method,
            total: sale.total,
            cash_amount: sale.cash_amount,
            electronic_amount: sale.electronic_amount,
        }
    }
}

/// The money-relevant part of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseAmount {
    pub payment_method: ExpensePaymentMethod,
    pub amount: Decimal,
}

impl From<&Expense> for ExpenseAmount {
    fn from(expense: &Expense) -> Self {
        Self {
            payment_method: expense.payment_method,
            amount: expense.amount,
        }
    }
}

/// Which linked sales a close counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleScope {
    /// Every linked sale, voided or not; used by the first close
    All,
    /// Active sales only; used when a close is recomputed
    ActiveOnly,
}

impl SaleScope {
    pub fn includes(self, sale: &SaleAmounts) -> bool {
        match self {
            SaleScope::All => true,
            SaleScope::ActiveOnly => sale.active,
        }
    }
}

/// Close snapshot of a session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloseTotals {
    pub cash_sales: Decimal,
    pub electronic_sales: Decimal,
    pub cash_expenses: Decimal,
    pub electronic_expenses: Decimal,
    pub cash_close: Decimal,
    pub electronic_close: Decimal,
    pub net_close: Decimal,
}

impl CloseTotals {
    /// Aggregate sales and expenses per payment method.
    ///
    /// Only sales in `scope` count. CASH and ELECTRONIC sales go to their
    /// bucket in full, MIXED sales split into both, TRANSFER counts in neither.
    pub fn compute(
        opening_balance: Decimal,
        scope: SaleScope,
        sales: &[SaleAmounts],
        expenses: &[ExpenseAmount],
    ) -> Self {
        let mut totals = CloseTotals::default();

        for sale in sales.iter().filter(|s| scope.includes(s)) {
            match sale.payment_method {
                PaymentMethod::Cash => totals.cash_sales += sale.total,
                PaymentMethod::Electronic => totals.electronic_sales += sale.total,
                PaymentMethod::Mixed => {
                    totals.cash_sales += sale.cash_amount.unwrap_or_default();
                    totals.electronic_sales += sale.electronic_amount.unwrap_or_default();
                }
                PaymentMethod::Transfer => {}
            }
        }

        for expense in expenses {
            match expense.payment_method {
                ExpensePaymentMethod::Cash => totals.cash_expenses += expense.amount,
                ExpensePaymentMethod::Electronic => totals.electronic_expenses += expense.amount,
                ExpensePaymentMethod::Transfer => {}
            }
        }

        totals.cash_close = totals.cash_sales - totals.cash_expenses;
        totals.electronic_close = totals.electronic_sales - totals.electronic_expenses;
        totals.net_close = totals.cash_close + totals.electronic_close + opening_balance;
        totals
    }
}

/// A session with everything linked to it, as consumed by the report renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRegisterDetail {
    #[serde(flatten)]
    pub session: CashRegisterSession,
    pub user_name: Option<String>,
    pub sales: Vec<Sale>,
    pub expenses: Vec<ExpenseView>,
}

/// Session row for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashRegisterSummary {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub session: CashRegisterSession,
    pub user_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sale(active: bool, method: PaymentMethod, total: Decimal) -> SaleAmounts {
        SaleAmounts {
            active,
            payment_method: method,
            total,
            cash_amount: None,
            electronic_amount: None,
        }
    }

    fn expense(method: ExpensePaymentMethod, amount: Decimal) -> ExpenseAmount {
        ExpenseAmount {
            payment_method: method,
            amount,
        }
    }

    #[test]
    fn test_recompute_excludes_voided_sales() {
        let sales = vec![
            sale(true, PaymentMethod::Cash, dec!(100)),
            sale(true, PaymentMethod::Cash, dec!(50)),
            sale(false, PaymentMethod::Cash, dec!(30)),
        ];
        let expenses = vec![expense(ExpensePaymentMethod::Cash, dec!(20))];

        let totals = CloseTotals::compute(dec!(10), SaleScope::ActiveOnly, &sales, &expenses);
        assert_eq!(totals.cash_sales, dec!(150));
        assert_eq!(totals.cash_expenses, dec!(20));
        assert_eq!(totals.cash_close, dec!(130));
        assert_eq!(totals.net_close, dec!(140));

        let first_close = CloseTotals::compute(dec!(10), SaleScope::All, &sales, &expenses);
        assert_eq!(first_close.cash_sales, dec!(180));
        assert_eq!(first_close.net_close, dec!(170));
    }

    #[test]
    fn test_mixed_sale_splits_and_transfer_is_ignored() {
        let mut mixed = sale(true, PaymentMethod::Mixed, dec!(80));
        mixed.cash_amount = Some(dec!(30));
        mixed.electronic_amount = Some(dec!(50));
        let sales = vec![
            mixed,
            sale(true, PaymentMethod::Electronic, dec!(20)),
            sale(true, PaymentMethod::Transfer, dec!(999)),
        ];
        let expenses = vec![
            expense(ExpensePaymentMethod::Electronic, dec!(15)),
            expense(ExpensePaymentMethod::Transfer, dec!(500)),
        ];

        let totals = CloseTotals::compute(Decimal::ZERO, SaleScope::All, &sales, &expenses);
        assert_eq!(totals.cash_sales, dec!(30));
        assert_eq!(totals.electronic_sales, dec!(70));
        assert_eq!(totals.electronic_expenses, dec!(15));
        assert_eq!(totals.electronic_close, dec!(55));
        assert_eq!(totals.net_close, dec!(85));
    }

    #[test]
    fn test_empty_session_nets_to_opening_balance() {
        let totals = CloseTotals::compute(dec!(250), SaleScope::All, &[], &[]);
        assert_eq!(totals.net_close, dec!(250));
        assert_eq!(totals.cash_close, Decimal::ZERO);
    }
}
