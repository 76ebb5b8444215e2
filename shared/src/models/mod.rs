//! Domain models for the retail POS inventory platform

mod adjustment;
mod cash_register;
mod catalog;
mod expense;
mod sale;
mod stock;
mod user;

pub use adjustment::*;
pub use cash_register::*;
pub use catalog::*;
pub use expense::*;
pub use sale::*;
pub use stock::*;
pub use user::*;
