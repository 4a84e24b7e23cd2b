//! Core Error Types
//!
//! Every core operation fails fast with one of these variants. The boundary
//! layer translates them into user-visible statuses via `code()` and
//! `http_status()`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core error taxonomy
///
/// Business-rule variants (insufficient funds, invalid transition, ...) are
/// expected, caller-recoverable conditions. `Crypto` is fatal for the
/// affected record and must never be swallowed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    CardNotActive(String),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    #[error("Transfer amount must be positive")]
    InvalidAmount,

    #[error("Source and target cards must be different")]
    SameCard,

    #[error("Cannot delete card with non-zero balance")]
    NonZeroBalance,

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Crypto(String),

    #[error("{0}")]
    AccessDenied(String),
}

impl CoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION",
            CoreError::InvalidTransition(_) => "INVALID_TRANSITION",
            CoreError::CardNotActive(_) => "CARD_NOT_ACTIVE",
            CoreError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CoreError::InvalidAmount => "INVALID_AMOUNT",
            CoreError::SameCard => "SAME_CARD",
            CoreError::NonZeroBalance => "NON_ZERO_BALANCE",
            CoreError::Duplicate(_) => "DUPLICATE",
            CoreError::Crypto(_) => "CRYPTO_FAILURE",
            CoreError::AccessDenied(_) => "ACCESS_DENIED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::NotFound(_) => 404,
            CoreError::Validation(_)
            | CoreError::InvalidTransition(_)
            | CoreError::InvalidAmount
            | CoreError::SameCard => 400,
            CoreError::CardNotActive(_)
            | CoreError::InsufficientFunds { .. }
            | CoreError::NonZeroBalance => 422,
            CoreError::Duplicate(_) => 409,
            CoreError::Crypto(_) => 500,
            CoreError::AccessDenied(_) => 401,
        }
    }
}
