//! Domain error model.

use thiserror::Error;

use crate::id::{ProductId, SupplierId};

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, missing references). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A value failed validation (e.g. malformed input, empty sale).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced supplier, product, stock position, or sale does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A decrement would drive the on-hand quantity below zero.
    #[error(
        "insufficient stock for product {product_id} from supplier {supplier_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        supplier_id: SupplierId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A return was requested on a sale line already marked returned.
    #[error("already returned: {0}")]
    AlreadyReturned(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_returned(msg: impl Into<String>) -> Self {
        Self::AlreadyReturned(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn insufficient_stock(
        supplier_id: SupplierId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            supplier_id,
            product_id,
            requested,
            available,
        }
    }
}
