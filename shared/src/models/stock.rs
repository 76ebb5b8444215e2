//! Stock ledger and movement log models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StockError;
use crate::types::{has_at_most_two_decimals, round2};

/// Quantity on hand of one product in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRecord {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity_on_hand: Decimal,
    pub last_purchase_price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "movement_direction", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Ingress,
    Egress,
}

impl MovementDirection {
    pub fn opposite(self) -> Self {
        match self {
            MovementDirection::Ingress => MovementDirection::Egress,
            MovementDirection::Egress => MovementDirection::Ingress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Ingress => "ingress",
            MovementDirection::Egress => "egress",
        }
    }
}

/// Immutable audit entry for one stock change.
///
/// Warehouse and product names are copied at write time so the entry stays
/// readable after a rename or delete; the ids become NULL on delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub warehouse_name: String,
    pub product_name: String,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Movement descriptions written by the core operations
pub mod movement_tag {
    pub const ADJUSTMENT: &str = "Ajuste";
    pub const ADJUSTMENT_EDITED: &str = "Ajuste Editado";
    pub const ADJUSTMENT_DELETED: &str = "Ajuste Eliminado";
    pub const SALE_VOIDED: &str = "Venta Anulada";
    pub const SALE_RESTORED: &str = "Venta Restaurada";
    pub const INITIAL_INVENTORY: &str = "INVENTARIO INICIAL";
    pub const CSV_IMPORT: &str = "IMPORTACION CSV";

    pub fn sale(code: &str) -> String {
        format!("Venta - {}", code)
    }

    pub fn sale_edited(code: &str) -> String {
        format!("Ajuste Venta - {}", code)
    }
}

/// One planned ledger mutation together with the movement that records it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOp {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub description: String,
}

impl StockOp {
    pub fn ingress(warehouse_id: Uuid, product_id: Uuid, quantity: Decimal, description: impl Into<String>) -> Self {
        Self {
            warehouse_id,
            product_id,
            direction: MovementDirection::Ingress,
            quantity,
            description: description.into(),
        }
    }

    pub fn egress(warehouse_id: Uuid, product_id: Uuid, quantity: Decimal, description: impl Into<String>) -> Self {
        Self {
            warehouse_id,
            product_id,
            direction: MovementDirection::Egress,
            quantity,
            description: description.into(),
        }
    }

    /// Positive for ingress, negative for egress
    pub fn signed_quantity(&self) -> Decimal {
        match self.direction {
            MovementDirection::Ingress => self.quantity,
            MovementDirection::Egress => -self.quantity,
        }
    }
}

/// A quantity the ledger accepts: positive and exact at two decimals, so the
/// record, the line and the movement all store the same value
pub fn check_quantity(quantity: Decimal) -> Result<(), StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    if !has_at_most_two_decimals(quantity) {
        return Err(StockError::TooPrecise(quantity));
    }
    Ok(())
}

/// New quantity on hand after adding `quantity`
pub fn add_quantity(on_hand: Decimal, quantity: Decimal) -> Result<Decimal, StockError> {
    check_quantity(quantity)?;
    Ok(round2(on_hand + quantity))
}

/// New quantity on hand after removing `quantity`; never goes below zero
pub fn subtract_quantity(on_hand: Decimal, quantity: Decimal) -> Result<Decimal, StockError> {
    check_quantity(quantity)?;
    if on_hand < quantity {
        return Err(StockError::Insufficient {
            available: on_hand,
            requested: quantity,
        });
    }
    Ok(round2(on_hand - quantity))
}

/// Apply a planned operation to an in-memory quantity
pub fn apply_to_quantity(on_hand: Decimal, op: &StockOp) -> Result<Decimal, StockError> {
    match op.direction {
        MovementDirection::Ingress => add_quantity(on_hand, op.quantity),
        MovementDirection::Egress => subtract_quantity(on_hand, op.quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_quantity() {
        assert_eq!(add_quantity(dec!(0), dec!(10)).unwrap(), dec!(10));
        assert_eq!(add_quantity(dec!(1.25), dec!(0.5)).unwrap(), dec!(1.75));
    }

    #[test]
    fn test_add_rejects_non_positive() {
        assert_eq!(
            add_quantity(dec!(5), dec!(0)),
            Err(StockError::NonPositiveQuantity(dec!(0)))
        );
        assert!(add_quantity(dec!(5), dec!(-1)).is_err());
    }

    #[test]
    fn test_subtract_quantity() {
        assert_eq!(subtract_quantity(dec!(10), dec!(4)).unwrap(), dec!(6));
        assert_eq!(subtract_quantity(dec!(4), dec!(4)).unwrap(), dec!(0));
    }

    #[test]
    fn test_subtract_insufficient() {
        assert_eq!(
            subtract_quantity(dec!(6), dec!(100)),
            Err(StockError::Insufficient {
                available: dec!(6),
                requested: dec!(100),
            })
        );
    }

    #[test]
    fn test_quantities_beyond_cents_are_rejected() {
        assert_eq!(subtract_quantity(dec!(10), dec!(2.345)), Err(StockError::TooPrecise(dec!(2.345))));
        assert_eq!(add_quantity(dec!(10), dec!(2.345)), Err(StockError::TooPrecise(dec!(2.345))));
        // Trailing zeros are not extra precision
        assert_eq!(subtract_quantity(dec!(10), dec!(2.350)).unwrap(), dec!(7.65));
    }

    #[test]
    fn test_sell_void_restore_returns_to_start() {
        let start = dec!(10);
        let quantity = dec!(2.35);
        let sold = subtract_quantity(start, quantity).unwrap();
        let voided = add_quantity(sold, quantity).unwrap();
        let restored = subtract_quantity(voided, quantity).unwrap();
        assert_eq!(sold, dec!(7.65));
        assert_eq!(voided, start);
        assert_eq!(restored, sold);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(MovementDirection::Ingress.opposite(), MovementDirection::Egress);
        assert_eq!(MovementDirection::Egress.opposite(), MovementDirection::Ingress);
    }

    #[test]
    fn test_stock_op_signed_quantity() {
        let w = Uuid::new_v4();
        let p = Uuid::new_v4();
        assert_eq!(StockOp::ingress(w, p, dec!(3), "x").signed_quantity(), dec!(3));
        assert_eq!(StockOp::egress(w, p, dec!(3), "x").signed_quantity(), dec!(-3));
    }

    #[test]
    fn test_movement_tags() {
        assert_eq!(movement_tag::sale("V0007"), "Venta - V0007");
        assert_eq!(movement_tag::sale_edited("V0007"), "Ajuste Venta - V0007");
    }
}
