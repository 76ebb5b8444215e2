//! Sale lifecycle tests
//!
//! Totals, payment splits, the Active/Voided state machine, and the stock
//! effects of creating, editing, voiding and restoring a sale.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    apply_to_quantity, compute_sale_totals, diff_sale_lines, movement_tag, resolve_payment_split, PaymentMethod, Sale,
    SaleLine, SaleLineInput, SaleStatus, StockError, StockOp, TransitionError,
};
use std::collections::HashMap;
use uuid::Uuid;

fn line_input(stock_record_id: Uuid, unit_price: Decimal, quantity: Decimal) -> SaleLineInput {
    SaleLineInput {
        stock_record_id,
        unit_price,
        quantity,
        unit_of_measure: "unit".to_string(),
    }
}

fn stored_line(input: &SaleLineInput, position: i32) -> SaleLine {
    SaleLine {
        id: Uuid::new_v4(),
        sale_id: Uuid::nil(),
        stock_record_id: Some(input.stock_record_id),
        product_name: "Arroz".to_string(),
        brand: None,
        unit_price: input.unit_price,
        quantity: input.quantity,
        unit_of_measure: input.unit_of_measure.clone(),
        subtotal: input.subtotal(),
        position,
    }
}

fn sale(active: bool) -> Sale {
    Sale {
        id: Uuid::new_v4(),
        seq: 1,
        code: "V0001".to_string(),
        sold_at: Utc::now(),
        edited_at: None,
        voided_at: None,
        voided_by: None,
        seller_id: Uuid::new_v4(),
        buyer_name: "Cliente".to_string(),
        active,
        subtotal: dec!(10),
        discount: dec!(0),
        total: dec!(10),
        payment_method: PaymentMethod::Cash,
        cash_amount: None,
        electronic_amount: None,
        cash_register_session_id: None,
        created_at: Utc::now(),
    }
}

/// Stock per record id; a single warehouse is enough here
#[derive(Debug, Clone, Default)]
struct Shelf {
    on_hand: HashMap<Uuid, Decimal>,
}

impl Shelf {
    fn apply(&mut self, ops: &[StockOp]) -> Result<(), StockError> {
        let mut next = self.on_hand.clone();
        for op in ops {
            let current = next.get(&op.product_id).copied().unwrap_or_default();
            next.insert(op.product_id, apply_to_quantity(current, op)?);
        }
        self.on_hand = next;
        Ok(())
    }

    fn get(&self, id: Uuid) -> Decimal {
        self.on_hand.get(&id).copied().unwrap_or_default()
    }
}

fn egress_lines(lines: &[SaleLine], tag: &str) -> Vec<StockOp> {
    lines
        .iter()
        .filter_map(|l| l.stock_record_id.map(|id| StockOp::egress(Uuid::nil(), id, l.quantity, tag)))
        .collect()
}

fn ingress_lines(lines: &[SaleLine], tag: &str) -> Vec<StockOp> {
    lines
        .iter()
        .filter_map(|l| l.stock_record_id.map(|id| StockOp::ingress(Uuid::nil(), id, l.quantity, tag)))
        .collect()
}

/// Stock operations of an edit, in the order the sale service runs them
fn edit_ops(existing: &[SaleLine], requested: &[SaleLineInput], code: &str) -> Vec<StockOp> {
    let tag = movement_tag::sale_edited(code);
    let diff = diff_sale_lines(existing, requested);
    let mut ops = ingress_lines(&diff.removed, &tag);
    for (old, new) in &diff.changed {
        ops.extend(ingress_lines(std::slice::from_ref(old), &tag));
        ops.push(StockOp::egress(Uuid::nil(), new.stock_record_id, new.quantity, tag.as_str()));
    }
    for new in &diff.added {
        ops.push(StockOp::egress(Uuid::nil(), new.stock_record_id, new.quantity, tag.as_str()));
    }
    ops
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_totals_computed_server_side() {
        let lines = [
            line_input(Uuid::new_v4(), dec!(2.50), dec!(4)),
            line_input(Uuid::new_v4(), dec!(1.99), dec!(3)),
        ];
        let totals = compute_sale_totals(&lines, dec!(1.97)).unwrap();
        assert_eq!(totals.subtotal, dec!(15.97));
        assert_eq!(totals.total, dec!(14.00));
    }

    #[test]
    fn test_discount_cannot_exceed_subtotal() {
        let lines = [line_input(Uuid::new_v4(), dec!(5), dec!(1))];
        assert!(compute_sale_totals(&lines, dec!(6)).is_err());
        assert!(compute_sale_totals(&lines, dec!(-1)).is_err());
        assert_eq!(compute_sale_totals(&lines, dec!(5)).unwrap().total, dec!(0));
    }

    #[test]
    fn test_mixed_payment_must_add_up() {
        assert_eq!(
            resolve_payment_split(PaymentMethod::Mixed, dec!(50), Some(dec!(20)), Some(dec!(30))),
            Ok((Some(dec!(20)), Some(dec!(30))))
        );
        assert!(resolve_payment_split(PaymentMethod::Mixed, dec!(50), Some(dec!(20)), Some(dec!(20))).is_err());
        assert!(resolve_payment_split(PaymentMethod::Mixed, dec!(50), Some(dec!(50)), None).is_err());
    }

    #[test]
    fn test_non_mixed_payment_drops_split() {
        assert_eq!(
            resolve_payment_split(PaymentMethod::Cash, dec!(50), Some(dec!(20)), Some(dec!(30))),
            Ok((None, None))
        );
    }

    #[test]
    fn test_state_machine() {
        assert_eq!(SaleStatus::Active.void(), Ok(SaleStatus::Voided));
        assert_eq!(SaleStatus::Voided.void(), Err(TransitionError::SaleAlreadyVoided));
        assert_eq!(SaleStatus::Voided.restore(), Ok(SaleStatus::Active));
        assert_eq!(SaleStatus::Active.restore(), Err(TransitionError::SaleAlreadyActive));
    }

    #[test]
    fn test_active_sale_cannot_be_deleted() {
        assert_eq!(sale(true).status().ensure_deletable(), Err(TransitionError::SaleNotVoided));
        assert_eq!(sale(false).status().ensure_deletable(), Ok(()));
    }

    #[test]
    fn test_voided_sale_cannot_be_edited() {
        assert_eq!(sale(false).status().ensure_editable(), Err(TransitionError::SaleNotEditable));
        assert_eq!(sale(true).status().ensure_editable(), Ok(()));
    }

    #[test]
    fn test_void_then_restore_is_stock_neutral() {
        let r1 = Uuid::new_v4();
        let r2 = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf
            .apply(&[
                StockOp::ingress(Uuid::nil(), r1, dec!(10), "x"),
                StockOp::ingress(Uuid::nil(), r2, dec!(4), "x"),
            ])
            .unwrap();

        let lines = vec![
            stored_line(&line_input(r1, dec!(1), dec!(3)), 0),
            stored_line(&line_input(r2, dec!(2), dec!(4)), 1),
        ];
        shelf.apply(&egress_lines(&lines, &movement_tag::sale("V0001"))).unwrap();
        assert_eq!((shelf.get(r1), shelf.get(r2)), (dec!(7), dec!(0)));

        shelf.apply(&ingress_lines(&lines, movement_tag::SALE_VOIDED)).unwrap();
        assert_eq!((shelf.get(r1), shelf.get(r2)), (dec!(10), dec!(4)));

        shelf.apply(&egress_lines(&lines, movement_tag::SALE_RESTORED)).unwrap();
        assert_eq!((shelf.get(r1), shelf.get(r2)), (dec!(7), dec!(0)));
    }

    #[test]
    fn test_edit_diff_by_stock_record() {
        let kept = Uuid::new_v4();
        let changed = Uuid::new_v4();
        let repriced = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = Uuid::new_v4();

        let existing = vec![
            stored_line(&line_input(kept, dec!(1), dec!(1)), 0),
            stored_line(&line_input(changed, dec!(1), dec!(2)), 1),
            stored_line(&line_input(repriced, dec!(1), dec!(1)), 2),
            stored_line(&line_input(removed, dec!(1), dec!(1)), 3),
        ];
        let requested = vec![
            line_input(kept, dec!(1), dec!(1)),
            line_input(changed, dec!(1), dec!(5)),
            line_input(repriced, dec!(3), dec!(1)),
            line_input(added, dec!(1), dec!(1)),
        ];

        let diff = diff_sale_lines(&existing, &requested);
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].stock_record_id, Some(removed));
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].1.quantity, dec!(5));
        assert_eq!(diff.repriced.len(), 1);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].stock_record_id, added);
    }

    #[test]
    fn test_edit_moves_only_the_difference() {
        let r = Uuid::new_v4();
        let mut shelf = Shelf::default();
        shelf.apply(&[StockOp::ingress(Uuid::nil(), r, dec!(10), "x")]).unwrap();

        let first = line_input(r, dec!(2), dec!(3));
        shelf.apply(&[StockOp::egress(Uuid::nil(), r, dec!(3), "Venta - V0001")]).unwrap();
        let existing = vec![stored_line(&first, 0)];

        let ops = edit_ops(&existing, &[line_input(r, dec!(2), dec!(5))], "V0001");
        assert!(ops.iter().all(|op| op.description == "Ajuste Venta - V0001"));
        shelf.apply(&ops).unwrap();
        assert_eq!(shelf.get(r), dec!(5));
    }

    #[test]
    fn test_orphaned_line_is_treated_as_removed() {
        let mut line = stored_line(&line_input(Uuid::new_v4(), dec!(1), dec!(1)), 0);
        line.stock_record_id = None;
        let diff = diff_sale_lines(&[line], &[]);
        assert_eq!(diff.removed.len(), 1);
        assert!(ingress_lines(&diff.removed, "x").is_empty());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..50).prop_map(Decimal::from)
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..10_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Total is the sum of line subtotals minus the discount
        #[test]
        fn prop_total_is_subtotal_minus_discount(
            lines in prop::collection::vec((price_strategy(), quantity_strategy()), 1..8),
            discount_pct in 0u32..=100,
        ) {
            let inputs: Vec<SaleLineInput> = lines
                .iter()
                .map(|(price, qty)| line_input(Uuid::new_v4(), *price, *qty))
                .collect();
            let subtotal: Decimal = inputs.iter().map(SaleLineInput::subtotal).sum();
            let discount = (subtotal * Decimal::from(discount_pct) / dec!(100)).round_dp(2);

            let totals = compute_sale_totals(&inputs, discount).unwrap();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.total, subtotal - discount);
            prop_assert!(totals.total >= Decimal::ZERO);
        }

        /// Editing from any line set to any other leaves stock as if only the
        /// final set had been sold
        #[test]
        fn prop_edit_equals_fresh_sale(
            before in prop::collection::vec(proptest::option::of(quantity_strategy()), 4),
            after in prop::collection::vec(proptest::option::of(quantity_strategy()), 4),
        ) {
            let records: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let initial = dec!(1000);
            let mut shelf = Shelf::default();
            let seed: Vec<StockOp> = records.iter().map(|r| StockOp::ingress(Uuid::nil(), *r, initial, "x")).collect();
            shelf.apply(&seed).unwrap();

            let existing: Vec<SaleLine> = records
                .iter()
                .zip(&before)
                .filter_map(|(r, q)| q.map(|q| line_input(*r, dec!(1), q)))
                .enumerate()
                .map(|(i, input)| stored_line(&input, i as i32))
                .collect();
            shelf.apply(&egress_lines(&existing, "Venta - V0001")).unwrap();

            let requested: Vec<SaleLineInput> = records
                .iter()
                .zip(&after)
                .filter_map(|(r, q)| q.map(|q| line_input(*r, dec!(1), q)))
                .collect();
            shelf.apply(&edit_ops(&existing, &requested, "V0001")).unwrap();

            for (record, quantity) in records.iter().zip(&after) {
                prop_assert_eq!(shelf.get(*record), initial - quantity.unwrap_or_default());
            }
        }
    }
}
