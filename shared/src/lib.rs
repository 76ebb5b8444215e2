//! Shared types and models for the retail POS inventory platform
//!
//! This crate holds the domain models and the pure planning logic (stock
//! arithmetic, adjustment edit plans, sale line diffs, cash close totals)
//! that the backend applies inside database transactions.

pub mod chart;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use chart::*;
pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
