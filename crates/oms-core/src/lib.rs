//! Core domain types for the order management core.
//!
//! This crate provides the types shared by every other crate in the workspace:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `OrderRequest`, `OrderConfirmation`: What goes to the exchange and what comes back
//! - `InstrumentPrecision`: Step/tick filters and exchange-compliant rounding
//! - `Position`, `AccountSnapshot`: Account state as reported by the exchange
//! - `OrderOutcome`, `CloseOutcome`: Discriminated per-call results

pub mod decimal;
pub mod error;
pub mod order;
pub mod outcome;
pub mod position;
pub mod precision;

pub use decimal::{Price, Size};
pub use error::{ValidationError, ValidationResult};
pub use order::{
    CancelAck, LeverageAck, MarketKind, OrderConfirmation, OrderRequest, OrderSide, OrderType,
    QuantityUnit, TimeInForce,
};
pub use outcome::{
    BatchResult, CloseOutcome, CloseReport, FailedOrder, FailureKind, OrderFailure, OrderOutcome,
};
pub use position::{AccountSnapshot, AssetBalance, FuturesAccount, Position, PositionView};
pub use precision::{decimals_for_increment, floor_to_increment, InstrumentPrecision};
