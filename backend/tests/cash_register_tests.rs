//! Cash register close tests

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    CashRegisterSession, CloseTotals, ExpenseAmount, ExpensePaymentMethod, PaymentMethod, SaleAmounts, SaleScope,
    SessionStatus,
    TransitionError,
};
use uuid::Uuid;

fn sale(active: bool, payment_method: PaymentMethod, total: Decimal) -> SaleAmounts {
    SaleAmounts {
        active,
        payment_method,
        total,
        cash_amount: None,
        electronic_amount: None,
    }
}

fn mixed(cash: Decimal, electronic: Decimal) -> SaleAmounts {
    SaleAmounts {
        active: true,
        payment_method: PaymentMethod::Mixed,
        total: cash + electronic,
        cash_amount: Some(cash),
        electronic_amount: Some(electronic),
    }
}

fn expense(payment_method: ExpensePaymentMethod, amount: Decimal) -> ExpenseAmount {
    ExpenseAmount { payment_method, amount }
}

fn session(closed: bool) -> CashRegisterSession {
    CashRegisterSession {
        id: Uuid::new_v4(),
        seq: 1,
        code: "CA0001".to_string(),
        user_id: Uuid::new_v4(),
        opened_at: Utc::now(),
        closed_at: closed.then(Utc::now),
        opening_balance: dec!(0),
        cash_sales: dec!(0),
        electronic_sales: dec!(0),
        cash_expenses: dec!(0),
        electronic_expenses: dec!(0),
        cash_close: dec!(0),
        electronic_close: dec!(0),
        net_close: dec!(0),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_recompute_scenario() {
        let sales = [
            sale(true, PaymentMethod::Cash, dec!(100)),
            sale(true, PaymentMethod::Cash, dec!(50)),
            sale(false, PaymentMethod::Cash, dec!(30)),
        ];
        let expenses = [expense(ExpensePaymentMethod::Cash, dec!(20))];

        let totals = CloseTotals::compute(dec!(10), SaleScope::ActiveOnly, &sales, &expenses);
        assert_eq!(totals.cash_sales, dec!(150));
        assert_eq!(totals.cash_expenses, dec!(20));
        assert_eq!(totals.cash_close, dec!(130));
        assert_eq!(totals.electronic_close, dec!(0));
        assert_eq!(totals.net_close, dec!(140));
    }

    #[test]
    fn test_first_close_counts_voided_sales() {
        let sales = [
            sale(true, PaymentMethod::Cash, dec!(100)),
            sale(true, PaymentMethod::Cash, dec!(50)),
            sale(false, PaymentMethod::Cash, dec!(30)),
        ];
        let expenses = [expense(ExpensePaymentMethod::Cash, dec!(20))];

        let totals = CloseTotals::compute(dec!(10), SaleScope::All, &sales, &expenses);
        assert_eq!(totals.cash_sales, dec!(180));
        assert_eq!(totals.cash_close, dec!(160));
        assert_eq!(totals.net_close, dec!(170));
    }

    #[test]
    fn test_scopes_agree_without_voided_sales() {
        let sales = [sale(true, PaymentMethod::Cash, dec!(40)), mixed(dec!(5), dec!(5))];
        assert_eq!(
            CloseTotals::compute(dec!(0), SaleScope::All, &sales, &[]),
            CloseTotals::compute(dec!(0), SaleScope::ActiveOnly, &sales, &[])
        );
    }

    #[test]
    fn test_mixed_splits_and_transfer_is_ignored() {
        let sales = [
            mixed(dec!(12), dec!(8)),
            sale(true, PaymentMethod::Electronic, dec!(5)),
            sale(true, PaymentMethod::Transfer, dec!(99)),
        ];
        let expenses = [
            expense(ExpensePaymentMethod::Electronic, dec!(3)),
            expense(ExpensePaymentMethod::Transfer, dec!(40)),
        ];

        let totals = CloseTotals::compute(dec!(0), SaleScope::All, &sales, &expenses);
        assert_eq!(totals.cash_sales, dec!(12));
        assert_eq!(totals.electronic_sales, dec!(13));
        assert_eq!(totals.electronic_expenses, dec!(3));
        assert_eq!(totals.net_close, dec!(22));
    }

    #[test]
    fn test_empty_session_closes_at_opening_balance() {
        let totals = CloseTotals::compute(dec!(75.50), SaleScope::All, &[], &[]);
        assert_eq!(totals.net_close, dec!(75.50));
        assert_eq!(totals.cash_close, dec!(0));
    }

    #[test]
    fn test_session_transitions() {
        assert_eq!(session(false).ensure_open(), Ok(()));
        assert_eq!(session(true).ensure_open(), Err(TransitionError::SessionAlreadyClosed));
        assert_eq!(session(true).ensure_closed(), Ok(()));
        assert_eq!(session(false).ensure_closed(), Err(TransitionError::SessionAlreadyOpen));
    }

    #[test]
    fn test_latest_status() {
        let open = session(false);
        assert_eq!(
            SessionStatus::of(&open),
            SessionStatus::Open {
                session_id: open.id,
                opened_at: open.opened_at,
            }
        );
        assert_eq!(SessionStatus::of(&session(true)), SessionStatus::Closed);
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(SessionStatus::Closed).unwrap();
        assert_eq!(json["status"], "closed");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Electronic),
            Just(PaymentMethod::Transfer),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// net_close is always both closes plus the opening balance
        #[test]
        fn prop_net_close_identity(
            opening in amount_strategy(),
            sales in prop::collection::vec((any::<bool>(), method_strategy(), amount_strategy()), 0..20),
            expenses in prop::collection::vec(amount_strategy(), 0..10),
        ) {
            let sales: Vec<SaleAmounts> = sales.into_iter().map(|(a, m, t)| sale(a, m, t)).collect();
            let expenses: Vec<ExpenseAmount> = expenses
                .into_iter()
                .map(|a| expense(ExpensePaymentMethod::Cash, a))
                .collect();

            let totals = CloseTotals::compute(opening, SaleScope::ActiveOnly, &sales, &expenses);
            prop_assert_eq!(totals.net_close, totals.cash_close + totals.electronic_close + opening);

            let active_cash: Decimal = sales
                .iter()
                .filter(|s| s.active && s.payment_method == PaymentMethod::Cash)
                .map(|s| s.total)
                .sum();
            prop_assert_eq!(totals.cash_sales, active_cash);
        }

        /// Voided sales never change a recomputed close
        #[test]
        fn prop_voided_sales_are_ignored(
            kept in prop::collection::vec(amount_strategy(), 0..10),
            voided in prop::collection::vec(amount_strategy(), 0..10),
        ) {
            let base: Vec<SaleAmounts> = kept.iter().map(|t| sale(true, PaymentMethod::Cash, *t)).collect();
            let mut with_voided = base.clone();
            with_voided.extend(voided.iter().map(|t| sale(false, PaymentMethod::Cash, *t)));

            prop_assert_eq!(
                CloseTotals::compute(dec!(0), SaleScope::ActiveOnly, &base, &[]),
                CloseTotals::compute(dec!(0), SaleScope::ActiveOnly, &with_voided, &[])
            );
        }
    }
}
