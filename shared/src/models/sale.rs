//! Sale models, lifecycle and line diffing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::types::round2;

/// How a sale was paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Electronic,
    Transfer,
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Electronic => "ELECTRONIC",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Mixed => "MIXED",
        }
    }
}

/// Lifecycle state of a sale: `Active ⇄ Voided → Deleted`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Active,
    Voided,
}

impl SaleStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            SaleStatus::Active
        } else {
            SaleStatus::Voided
        }
    }

    pub fn is_active(self) -> bool {
        self == SaleStatus::Active
    }

    pub fn void(self) -> Result<SaleStatus, TransitionError> {
        match self {
            SaleStatus::Active => Ok(SaleStatus::Voided),
            SaleStatus::Voided => Err(TransitionError::SaleAlreadyVoided),
        }
    }

    pub fn restore(self) -> Result<SaleStatus, TransitionError> {
        match self {
            SaleStatus::Voided => Ok(SaleStatus::Active),
            SaleStatus::Active => Err(TransitionError::SaleAlreadyActive),
        }
    }

    pub fn ensure_deletable(self) -> Result<(), TransitionError> {
        match self {
            SaleStatus::Voided => Ok(()),
            SaleStatus::Active => Err(TransitionError::SaleNotVoided),
        }
    }

    pub fn ensure_editable(self) -> Result<(), TransitionError> {
        match self {
            SaleStatus::Active => Ok(()),
            SaleStatus::Voided => Err(TransitionError::SaleNotEditable),
        }
    }
}

/// Sale header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub sold_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub seller_id: Uuid,
    pub buyer_name: String,
    pub active: bool,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub cash_amount: Option<Decimal>,
    pub electronic_amount: Option<Decimal>,
    pub cash_register_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn status(&self) -> SaleStatus {
        SaleStatus::from_active(self.active)
    }
}

/// Persisted sale line. `stock_record_id` is NULL once the stock record is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub stock_record_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub subtotal: Decimal,
    pub position: i32,
}

/// Requested sale line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleLineInput {
    pub stock_record_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub unit_of_measure: String,
}

impl SaleLineInput {
    pub fn subtotal(&self) -> Decimal {
        round2(self.unit_price * self.quantity)
    }
}

/// A sale with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithLines {
    #[serde(flatten)]
    pub sale: Sale,
    pub seller_name: Option<String>,
    pub lines: Vec<SaleLine>,
}

/// Server-computed sale amounts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Compute line subtotals, subtotal and total for a set of requested lines
pub fn compute_sale_totals(lines: &[SaleLineInput], discount: Decimal) -> Result<SaleTotals, &'static str> {
    if discount < Decimal::ZERO {
        return Err("Discount cannot be negative");
    }
    let subtotal: Decimal = lines.iter().map(SaleLineInput::subtotal).sum();
    if discount > subtotal {
        return Err("Discount cannot exceed the subtotal");
    }
    Ok(SaleTotals {
        subtotal,
        discount: round2(discount),
        total: round2(subtotal - discount),
    })
}

/// Check the cash/electronic split required by MIXED payments.
///
/// Returns the amounts to persist: both set for MIXED, neither otherwise.
pub fn resolve_payment_split(
    method: PaymentMethod,
    total: Decimal,
    cash_amount: Option<Decimal>,
    electronic_amount: Option<Decimal>,
) -> Result<(Option<Decimal>, Option<Decimal>), &'static str> {
    if method != PaymentMethod::Mixed {
        return Ok((None, None));
    }
    let (Some(cash), Some(electronic)) = (cash_amount, electronic_amount) else {
        return Err("Mixed payments require both cash and electronic amounts");
    };
    if cash < Decimal::ZERO || electronic < Decimal::ZERO {
        return Err("Payment amounts cannot be negative");
    }
    if round2(cash + electronic) != round2(total) {
        return Err("Cash and electronic amounts must add up to the sale total");
    }
    Ok((Some(cash), Some(electronic)))
}

/// Result of comparing stored sale lines with a requested set, keyed by stock record
#[derive(Debug, Clone, Default)]
pub struct SaleLineDiff {
    /// Lines no longer requested; their stock goes back in
    pub removed: Vec<SaleLine>,
    /// Lines whose quantity changed: reverse and delete the old one, then recreate
    pub changed: Vec<(SaleLine, SaleLineInput)>,
    /// Same quantity but a different price or unit; rewritten without stock effect
    pub repriced: Vec<(SaleLine, SaleLineInput)>,
    /// Lines not present before
    pub added: Vec<SaleLineInput>,
}

impl SaleLineDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.changed.is_empty() && self.repriced.is_empty() && self.added.is_empty()
    }
}

/// Diff stored lines against requested ones by stock record id
pub fn diff_sale_lines(existing: &[SaleLine], requested: &[SaleLineInput]) -> SaleLineDiff {
    let mut diff = SaleLineDiff::default();

    for old in existing {
        let matched = old
            .stock_record_id
            .and_then(|id| requested.iter().find(|l| l.stock_record_id == id));

        match matched {
            None => diff.removed.push(old.clone()),
            Some(new) if new.quantity != old.quantity => diff.changed.push((old.clone(), new.clone())),
            Some(new) if new.unit_price != old.unit_price || new.unit_of_measure != old.unit_of_measure => {
                diff.repriced.push((old.clone(), new.clone()))
            }
            Some(_) => {}
        }
    }

    for new in requested {
        if !existing
            .iter()
            .any(|l| l.stock_record_id == Some(new.stock_record_id))
        {
            diff.added.push(new.clone());
        }
    }

    diff
}

/// A product ranked by units sold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TopProduct {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity_sold: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stored(stock_record_id: Uuid, quantity: Decimal) -> SaleLine {
        SaleLine {
            id: Uuid::new_v4(),
            sale_id: Uuid::nil(),
            stock_record_id: Some(stock_record_id),
            product_name: "Arroz".to_string(),
            brand: None,
            unit_price: dec!(10),
            quantity,
            unit_of_measure: "unit".to_string(),
            subtotal: dec!(10) * quantity,
            position: 0,
        }
    }

    fn input(stock_record_id: Uuid, quantity: Decimal) -> SaleLineInput {
        SaleLineInput {
            stock_record_id,
            unit_price: dec!(10),
            quantity,
            unit_of_measure: "unit".to_string(),
        }
    }

    #[test]
    fn test_status_transitions() {
        assert_eq!(SaleStatus::Active.void(), Ok(SaleStatus::Voided));
        assert_eq!(SaleStatus::Voided.void(), Err(TransitionError::SaleAlreadyVoided));
        assert_eq!(SaleStatus::Voided.restore(), Ok(SaleStatus::Active));
        assert_eq!(SaleStatus::Active.restore(), Err(TransitionError::SaleAlreadyActive));
    }

    #[test]
    fn test_only_voided_sales_are_deletable() {
        assert!(SaleStatus::Voided.ensure_deletable().is_ok());
        assert_eq!(
            SaleStatus::Active.ensure_deletable(),
            Err(TransitionError::SaleNotVoided)
        );
    }

    #[test]
    fn test_compute_totals() {
        let r = Uuid::new_v4();
        let lines = vec![input(r, dec!(2)), input(Uuid::new_v4(), dec!(1.5))];
        let totals = compute_sale_totals(&lines, dec!(5)).unwrap();
        assert_eq!(totals.subtotal, dec!(35));
        assert_eq!(totals.total, dec!(30));
    }

    #[test]
    fn test_discount_above_subtotal_rejected() {
        let lines = vec![input(Uuid::new_v4(), dec!(1))];
        assert!(compute_sale_totals(&lines, dec!(11)).is_err());
        assert!(compute_sale_totals(&lines, dec!(-1)).is_err());
    }

    #[test]
    fn test_mixed_payment_split() {
        assert_eq!(
            resolve_payment_split(PaymentMethod::Mixed, dec!(100), Some(dec!(60)), Some(dec!(40))),
            Ok((Some(dec!(60)), Some(dec!(40))))
        );
        assert!(resolve_payment_split(PaymentMethod::Mixed, dec!(100), Some(dec!(60)), Some(dec!(30))).is_err());
        assert!(resolve_payment_split(PaymentMethod::Mixed, dec!(100), Some(dec!(100)), None).is_err());
    }

    #[test]
    fn test_non_mixed_payment_drops_split() {
        assert_eq!(
            resolve_payment_split(PaymentMethod::Cash, dec!(100), Some(dec!(60)), None),
            Ok((None, None))
        );
    }

    #[test]
    fn test_diff_sale_lines() {
        let kept = Uuid::new_v4();
        let changed = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = Uuid::new_v4();

        let existing = vec![stored(kept, dec!(1)), stored(changed, dec!(2)), stored(removed, dec!(3))];
        let requested = vec![input(kept, dec!(1)), input(changed, dec!(5)), input(added, dec!(4))];

        let diff = diff_sale_lines(&existing, &requested);
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].stock_record_id, Some(removed));
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].1.quantity, dec!(5));
        assert_eq!(diff.added, vec![input(added, dec!(4))]);
        assert!(diff.repriced.is_empty());
    }

    #[test]
    fn test_diff_detects_price_only_change() {
        let r = Uuid::new_v4();
        let existing = vec![stored(r, dec!(2))];
        let mut new = input(r, dec!(2));
        new.unit_price = dec!(12);

        let diff = diff_sale_lines(&existing, &[new]);
        assert_eq!(diff.repriced.len(), 1);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn test_diff_orphaned_line_is_removed() {
        let mut orphan = stored(Uuid::new_v4(), dec!(1));
        orphan.stock_record_id = None;
        let diff = diff_sale_lines(&[orphan], &[]);
        assert_eq!(diff.removed.len(), 1);
    }
}
