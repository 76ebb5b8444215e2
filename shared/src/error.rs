//! Pure domain errors raised by the planning logic

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from stock ledger arithmetic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("Quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("Quantity may have at most two decimal places, got {0}")]
    TooPrecise(Decimal),

    #[error("Insufficient stock: {available} available, {requested} requested")]
    Insufficient {
        available: Decimal,
        requested: Decimal,
    },
}

/// Rejected lifecycle transitions for sales and cash register sessions
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Sale is already voided")]
    SaleAlreadyVoided,

    #[error("Sale is already active")]
    SaleAlreadyActive,

    #[error("Sale must be voided before deletion")]
    SaleNotVoided,

    #[error("Only active sales can be edited")]
    SaleNotEditable,

    #[error("Cash register session is already closed")]
    SessionAlreadyClosed,

    #[error("Cash register session is already open")]
    SessionAlreadyOpen,

    #[error("Cash register session is not open")]
    SessionNotOpen,

    #[error("All sales of the session must be voided before it can be removed")]
    SessionHasActiveSales,
}

impl TransitionError {
    /// Spanish message for the bilingual error body
    pub fn message_es(&self) -> &'static str {
        match self {
            TransitionError::SaleAlreadyVoided => "La venta ya está anulada",
            TransitionError::SaleAlreadyActive => "La venta ya está activa",
            TransitionError::SaleNotVoided => "La venta debe anularse antes de eliminarla",
            TransitionError::SaleNotEditable => "Solo se pueden editar ventas activas",
            TransitionError::SessionAlreadyClosed => "Esta caja ya está cerrada",
            TransitionError::SessionAlreadyOpen => "La caja ya está abierta",
            TransitionError::SessionNotOpen => "La caja no está abierta",
            TransitionError::SessionHasActiveSales => {
                "Todas las ventas de la caja deben estar anuladas antes de eliminarla"
            }
        }
    }
}
