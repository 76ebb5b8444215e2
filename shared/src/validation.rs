//! Validation utilities for the retail POS inventory platform

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{AdjustmentLineInput, SaleLineInput};
use crate::types::has_at_most_two_decimals;

// ============================================================================
// Account Validations
// ============================================================================

/// Usernames are 3-30 characters: lowercase letters, digits, `.`, `_` or `-`
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 30 {
        return Err("Username must be between 3 and 30 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err("Username may only contain lowercase letters, digits, '.', '_' and '-'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Phone numbers: optional leading `+`, then 7-15 digits (spaces and dashes ignored)
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err("Phone number contains invalid characters");
    }
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

// ============================================================================
// Amount Validations
// ============================================================================

/// Positive, with at most two decimal places
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if !has_at_most_two_decimals(quantity) {
        return Err("Quantity may have at most two decimal places");
    }
    Ok(())
}

pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Line Item Validations
// ============================================================================

/// At least one line, positive quantities, one line per product
pub fn validate_adjustment_lines(lines: &[AdjustmentLineInput]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("An adjustment needs at least one line");
    }
    let mut seen = HashSet::new();
    for line in lines {
        validate_positive_quantity(line.quantity)?;
        if !seen.insert(line.product_id) {
            return Err("A product may appear only once per adjustment");
        }
    }
    Ok(())
}

/// At least one line, positive quantities, non-negative prices, one line per stock record
pub fn validate_sale_lines(lines: &[SaleLineInput]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("A sale needs at least one line");
    }
    let mut seen = HashSet::new();
    for line in lines {
        validate_positive_quantity(line.quantity)?;
        if line.unit_price < Decimal::ZERO {
            return Err("Unit price cannot be negative");
        }
        if !seen.insert(line.stock_record_id) {
            return Err("A stock record may appear only once per sale");
        }
    }
    Ok(())
}
