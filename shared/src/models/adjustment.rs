//! Inventory adjustment models and the edit planner

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock::{movement_tag, MovementDirection, StockOp};

/// Direction of an adjustment line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "adjustment_direction", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentDirection {
    Increment,
    Decrement,
}

impl AdjustmentDirection {
    pub fn movement(self) -> MovementDirection {
        match self {
            AdjustmentDirection::Increment => MovementDirection::Ingress,
            AdjustmentDirection::Decrement => MovementDirection::Egress,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            AdjustmentDirection::Increment => AdjustmentDirection::Decrement,
            AdjustmentDirection::Decrement => AdjustmentDirection::Increment,
        }
    }
}

/// Adjustment header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub warehouse_id: Uuid,
    pub user_id: Uuid,
    pub adjusted_on: NaiveDate,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted adjustment line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdjustmentLine {
    pub id: Uuid,
    pub adjustment_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub direction: AdjustmentDirection,
    pub position: i32,
}

/// Requested adjustment line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjustmentLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub direction: AdjustmentDirection,
}

impl AdjustmentLineInput {
    /// Full stock effect of the line when first applied
    pub fn stock_op(&self, warehouse_id: Uuid, description: &str) -> StockOp {
        StockOp {
            warehouse_id,
            product_id: self.product_id,
            direction: self.direction.movement(),
            quantity: self.quantity,
            description: description.to_string(),
        }
    }
}

impl AdjustmentLine {
    /// Stock operation undoing this line's effect
    pub fn reversal(&self, warehouse_id: Uuid, description: &str) -> StockOp {
        StockOp {
            warehouse_id,
            product_id: self.product_id,
            direction: self.direction.movement().opposite(),
            quantity: self.quantity,
            description: description.to_string(),
        }
    }
}

/// A stored line whose quantity or direction changes in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentLineUpdate {
    pub line_id: Uuid,
    pub quantity: Decimal,
    pub direction: AdjustmentDirection,
    pub unit_of_measure: String,
}

/// Everything an adjustment edit must do, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentPlan {
    pub stock_ops: Vec<StockOp>,
    pub deleted_lines: Vec<Uuid>,
    pub updated_lines: Vec<AdjustmentLineUpdate>,
    pub new_lines: Vec<AdjustmentLineInput>,
}

impl AdjustmentPlan {
    /// Net signed quantity the plan applies to one product
    pub fn net_effect(&self, product_id: Uuid) -> Decimal {
        self.stock_ops
            .iter()
            .filter(|op| op.product_id == product_id)
            .map(StockOp::signed_quantity)
            .sum()
    }
}

/// Plan the stock operations and line edits that turn `existing` into `requested`.
///
/// Lines are matched by product. A changed direction first reverses the old
/// effect and then applies `new + old` in the new direction; the stored line
/// keeps that applied quantity so the ledger and the lines stay in step.
pub fn plan_adjustment_update(
    warehouse_id: Uuid,
    existing: &[AdjustmentLine],
    requested: &[AdjustmentLineInput],
) -> AdjustmentPlan {
    let mut plan = AdjustmentPlan::default();

    for old in existing {
        let Some(new) = requested.iter().find(|l| l.product_id == old.product_id) else {
            plan.stock_ops
                .push(old.reversal(warehouse_id, movement_tag::ADJUSTMENT_EDITED));
            plan.deleted_lines.push(old.id);
            continue;
        };

        if new.direction != old.direction {
            let applied = new.quantity + old.quantity;
            plan.stock_ops
                .push(old.reversal(warehouse_id, movement_tag::ADJUSTMENT_EDITED));
            plan.stock_ops.push(StockOp {
                warehouse_id,
                product_id: old.product_id,
                direction: new.direction.movement(),
                quantity: applied,
                description: movement_tag::ADJUSTMENT_EDITED.to_string(),
            });
            plan.updated_lines.push(AdjustmentLineUpdate {
                line_id: old.id,
                quantity: applied,
                direction: new.direction,
                unit_of_measure: new.unit_of_measure.clone(),
            });
        } else if new.quantity != old.quantity {
            let delta = new.quantity - old.quantity;
            let direction = if delta > Decimal::ZERO {
                old.direction.movement()
            } else {
                old.direction.movement().opposite()
            };
            plan.stock_ops.push(StockOp {
                warehouse_id,
                product_id: old.product_id,
                direction,
                quantity: delta.abs(),
                description: movement_tag::ADJUSTMENT_EDITED.to_string(),
            });
            plan.updated_lines.push(AdjustmentLineUpdate {
                line_id: old.id,
                quantity: new.quantity,
                direction: old.direction,
                unit_of_measure: new.unit_of_measure.clone(),
            });
        }
    }

    for new in requested {
        if !existing.iter().any(|l| l.product_id == new.product_id) {
            plan.stock_ops
                .push(new.stock_op(warehouse_id, movement_tag::ADJUSTMENT));
            plan.new_lines.push(new.clone());
        }
    }

    plan
}

/// Stock operations that fully undo an adjustment
pub fn plan_adjustment_reversal(warehouse_id: Uuid, lines: &[AdjustmentLine]) -> Vec<StockOp> {
    lines
        .iter()
        .map(|l| l.reversal(warehouse_id, movement_tag::ADJUSTMENT_DELETED))
        .collect()
}

/// Net signed effect of stored lines on one product
pub fn lines_net_effect(lines: &[AdjustmentLine], product_id: Uuid) -> Decimal {
    lines
        .iter()
        .filter(|l| l.product_id == product_id)
        .map(|l| match l.direction {
            AdjustmentDirection::Increment => l.quantity,
            AdjustmentDirection::Decrement => -l.quantity,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stored(product_id: Uuid, quantity: Decimal, direction: AdjustmentDirection) -> AdjustmentLine {
        AdjustmentLine {
            id: Uuid::new_v4(),
            adjustment_id: Uuid::nil(),
            product_id,
            quantity,
            unit_of_measure: "unit".to_string(),
            direction,
            position: 0,
        }
    }

    fn input(product_id: Uuid, quantity: Decimal, direction: AdjustmentDirection) -> AdjustmentLineInput {
        AdjustmentLineInput {
            product_id,
            quantity,
            unit_of_measure: "unit".to_string(),
            direction,
        }
    }

    #[test]
    fn test_same_direction_increase_applies_only_delta() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(w, &existing, &[input(p, dec!(8), AdjustmentDirection::Increment)]);

        assert_eq!(plan.stock_ops.len(), 1);
        assert_eq!(plan.stock_ops[0].direction, MovementDirection::Ingress);
        assert_eq!(plan.stock_ops[0].quantity, dec!(3));
        assert_eq!(plan.stock_ops[0].description, "Ajuste Editado");
        assert_eq!(plan.updated_lines[0].quantity, dec!(8));
    }

    #[test]
    fn test_same_direction_decrease_reverses_delta() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(w, &existing, &[input(p, dec!(2), AdjustmentDirection::Increment)]);

        assert_eq!(plan.stock_ops[0].direction, MovementDirection::Egress);
        assert_eq!(plan.stock_ops[0].quantity, dec!(3));
        assert_eq!(plan.net_effect(p), dec!(-3));
    }

    #[test]
    fn test_decrement_line_growing_takes_more_stock() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(2), AdjustmentDirection::Decrement)];
        let plan = plan_adjustment_update(w, &existing, &[input(p, dec!(6), AdjustmentDirection::Decrement)]);

        assert_eq!(plan.net_effect(p), dec!(-4));
    }

    #[test]
    fn test_unchanged_line_produces_nothing() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(w, &existing, &[input(p, dec!(5), AdjustmentDirection::Increment)]);

        assert_eq!(plan, AdjustmentPlan::default());
    }

    #[test]
    fn test_removed_line_is_reversed_and_deleted() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(w, &existing, &[]);

        assert_eq!(plan.deleted_lines, vec![existing[0].id]);
        assert_eq!(plan.net_effect(p), dec!(-5));
    }

    #[test]
    fn test_direction_change_applies_new_plus_old() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(w, &existing, &[input(p, dec!(3), AdjustmentDirection::Decrement)]);

        assert_eq!(plan.stock_ops.len(), 2);
        assert_eq!(plan.stock_ops[1].quantity, dec!(8));
        // reverse +5, then -8
        assert_eq!(plan.net_effect(p), dec!(-13));
        assert_eq!(plan.updated_lines[0].quantity, dec!(8));
        assert_eq!(plan.updated_lines[0].direction, AdjustmentDirection::Decrement);
    }

    #[test]
    fn test_new_line_applies_full_effect() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let existing = vec![stored(p, dec!(5), AdjustmentDirection::Increment)];
        let plan = plan_adjustment_update(
            w,
            &existing,
            &[
                input(p, dec!(5), AdjustmentDirection::Increment),
                input(q, dec!(4), AdjustmentDirection::Decrement),
            ],
        );

        assert_eq!(plan.new_lines.len(), 1);
        assert_eq!(plan.stock_ops[0].description, "Ajuste");
        assert_eq!(plan.net_effect(q), dec!(-4));
    }

    #[test]
    fn test_reversal_plan_uses_deleted_tag() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        let lines = vec![stored(p, dec!(8), AdjustmentDirection::Increment)];
        let ops = plan_adjustment_reversal(w, &lines);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].direction, MovementDirection::Egress);
        assert_eq!(ops[0].quantity, dec!(8));
        assert_eq!(ops[0].description, "Ajuste Eliminado");
    }
}
