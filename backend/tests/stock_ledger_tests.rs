//! Stock ledger tests
//!
//! Ledger arithmetic and the all-or-nothing application of stock operations,
//! run against an in-memory ledger keyed by (warehouse, product).

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{apply_to_quantity, MovementDirection, StockError, StockOp};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory stand-in for the stock_records table plus the movement log
#[derive(Debug, Clone, Default)]
struct Ledger {
    on_hand: HashMap<(Uuid, Uuid), Decimal>,
    movements: Vec<StockOp>,
}

impl Ledger {
    fn quantity(&self, warehouse_id: Uuid, product_id: Uuid) -> Decimal {
        self.on_hand
            .get(&(warehouse_id, product_id))
            .copied()
            .unwrap_or_default()
    }

    fn apply(&mut self, op: &StockOp) -> Result<Decimal, StockError> {
        let key = (op.warehouse_id, op.product_id);
        if op.direction == MovementDirection::Egress && !self.on_hand.contains_key(&key) {
            return Err(StockError::Insufficient {
                available: Decimal::ZERO,
                requested: op.quantity,
            });
        }
        let next = apply_to_quantity(self.quantity(op.warehouse_id, op.product_id), op)?;
        self.on_hand.insert(key, next);
        self.movements.push(op.clone());
        Ok(next)
    }

    /// Apply every op or none of them
    fn apply_all(&mut self, ops: &[StockOp]) -> Result<(), StockError> {
        let mut tx = self.clone();
        for op in ops {
            tx.apply(op)?;
        }
        *self = tx;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_sub_cent_quantities_never_reach_the_ledger() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let mut ledger = Ledger::default();
        ledger.apply(&StockOp::ingress(w, p, dec!(10), "Ajuste")).unwrap();

        let err = ledger
            .apply(&StockOp::egress(w, p, dec!(2.345), "Venta - V0001"))
            .unwrap_err();
        assert_eq!(err, StockError::TooPrecise(dec!(2.345)));
        assert!(ledger
            .apply(&StockOp::ingress(w, p, dec!(0.125), "Ajuste"))
            .is_err());

        assert_eq!(ledger.quantity(w, p), dec!(10));
        assert_eq!(ledger.movements.len(), 1);
    }

    #[test]
    fn test_add_then_subtract_scenario() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let mut ledger = Ledger::default();

        assert_eq!(ledger.apply(&StockOp::ingress(w, p, dec!(10), "Ajuste")).unwrap(), dec!(10));
        assert_eq!(ledger.apply(&StockOp::egress(w, p, dec!(4), "Venta - V0001")).unwrap(), dec!(6));

        let err = ledger
            .apply(&StockOp::egress(w, p, dec!(100), "Venta - V0002"))
            .unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                available: dec!(6),
                requested: dec!(100),
            }
        );
        assert_eq!(ledger.quantity(w, p), dec!(6));
        assert_eq!(ledger.movements.len(), 2);
    }

    #[test]
    fn test_failed_second_line_leaves_first_untouched() {
        let w = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut ledger = Ledger::default();
        ledger.apply(&StockOp::ingress(w, a, dec!(5), "x")).unwrap();
        ledger.apply(&StockOp::ingress(w, b, dec!(1), "x")).unwrap();

        let sale = [
            StockOp::egress(w, a, dec!(2), "Venta - V0003"),
            StockOp::egress(w, b, dec!(3), "Venta - V0003"),
        ];
        assert!(ledger.apply_all(&sale).is_err());

        assert_eq!(ledger.quantity(w, a), dec!(5));
        assert_eq!(ledger.quantity(w, b), dec!(1));
        assert_eq!(ledger.movements.len(), 2);
    }

    #[test]
    fn test_subtract_without_record_fails() {
        let mut ledger = Ledger::default();
        let result = ledger.apply(&StockOp::egress(Uuid::new_v4(), Uuid::new_v4(), dec!(1), "x"));
        assert!(result.is_err());
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut ledger = Ledger::default();
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        assert_eq!(
            ledger.apply(&StockOp::ingress(w, p, dec!(0), "x")),
            Err(StockError::NonPositiveQuantity(dec!(0)))
        );
        assert!(ledger.movements.is_empty());
    }

    #[test]
    fn test_records_are_per_warehouse() {
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let p = Uuid::new_v4();
        let mut ledger = Ledger::default();
        ledger.apply(&StockOp::ingress(w1, p, dec!(3), "x")).unwrap();

        assert_eq!(ledger.quantity(w2, p), dec!(0));
        assert!(ledger.apply(&StockOp::egress(w2, p, dec!(1), "x")).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn op_strategy() -> impl Strategy<Value = (bool, Decimal)> {
        (any::<bool>(), quantity_strategy())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// On hand always equals ingress minus egress of the movements written
        #[test]
        fn prop_on_hand_matches_movement_log(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let w = Uuid::new_v4();
            let p = Uuid::new_v4();
            let mut ledger = Ledger::default();

            for (ingress, quantity) in ops {
                let op = if ingress {
                    StockOp::ingress(w, p, quantity, "x")
                } else {
                    StockOp::egress(w, p, quantity, "x")
                };
                let before = ledger.quantity(w, p);
                if ledger.apply(&op).is_err() {
                    prop_assert_eq!(ledger.quantity(w, p), before);
                }
                prop_assert!(ledger.quantity(w, p) >= Decimal::ZERO);
            }

            let net: Decimal = ledger.movements.iter().map(StockOp::signed_quantity).sum();
            prop_assert_eq!(ledger.quantity(w, p), net);
        }

        /// A rejected subtraction never changes the quantity on hand
        #[test]
        fn prop_insufficient_leaves_quantity(on_hand in quantity_strategy(), extra in quantity_strategy()) {
            let w = Uuid::new_v4();
            let p = Uuid::new_v4();
            let mut ledger = Ledger::default();
            ledger.apply(&StockOp::ingress(w, p, on_hand, "x")).unwrap();

            let result = ledger.apply(&StockOp::egress(w, p, on_hand + extra, "x"));
            let is_insufficient = matches!(result, Err(StockError::Insufficient { .. }));
            prop_assert!(is_insufficient);
            prop_assert_eq!(ledger.quantity(w, p), on_hand);
        }
    }
}
