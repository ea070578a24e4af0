//! Validation errors.
//!
//! Everything in here is a caller/programmer-class problem: it is detected
//! locally and never represents an exchange-side rejection.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API credentials must be provided")]
    MissingCredentials,

    #[error("Symbol {0} not found in exchange info")]
    InstrumentNotFound(String),

    #[error("Invalid instrument filter for {symbol}: {reason}")]
    InvalidInstrumentFilter { symbol: String, reason: String },

    #[error("Invalid leverage {0}: must be positive")]
    InvalidLeverage(i64),

    #[error("Invalid close percentage {0}: must be in (0, 100]")]
    InvalidPercentage(Decimal),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid order side: {0}")]
    InvalidSide(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("Quantity {quantity} for {symbol} rounds to zero at step size {step_size}")]
    QuantityBelowStep {
        symbol: String,
        quantity: Decimal,
        step_size: Decimal,
    },

    #[error("Quantity unit {unit} is not supported on {market} orders")]
    UnsupportedQuantityUnit { unit: String, market: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for validation-checked operations.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
