//! Close sizing policy.

use oms_core::{Price, QuantityUnit, Size, ValidationError, ValidationResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// How much of each open position a close sweep closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum CloseSizingPolicy {
    /// The whole position.
    #[default]
    AllOpen,
    /// A fixed number of contracts.
    FixedQuantity(Decimal),
    /// A fixed quote-currency amount, converted at the mark price.
    FixedNotionalUsd(Decimal),
    /// A share of the position, in (0, 100].
    Percentage(Decimal),
}

impl CloseSizingPolicy {
    /// Pick one policy from loosely supplied parameters.
    ///
    /// Precedence: percentage, then notional (quantity with a `NotionalUsd`
    /// unit), then fixed quantity, then the whole position.
    pub fn from_parts(
        quantity: Option<Decimal>,
        unit: QuantityUnit,
        percentage: Option<Decimal>,
    ) -> ValidationResult<Self> {
        let policy = match (percentage, quantity, unit) {
            (Some(p), _, _) => Self::Percentage(p),
            (None, Some(q), QuantityUnit::NotionalUsd) => Self::FixedNotionalUsd(q),
            (None, Some(q), QuantityUnit::Contracts) => Self::FixedQuantity(q),
            (None, None, _) => Self::AllOpen,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        match *self {
            Self::AllOpen => Ok(()),
            Self::Percentage(p) if p <= Decimal::ZERO || p > HUNDRED => {
                Err(ValidationError::InvalidPercentage(p))
            }
            Self::FixedQuantity(q) if q <= Decimal::ZERO => Err(ValidationError::InvalidQuantity(
                format!("close quantity must be positive, got {q}"),
            )),
            Self::FixedNotionalUsd(u) if u <= Decimal::ZERO => Err(
                ValidationError::InvalidQuantity(format!("close notional must be positive, got {u}")),
            ),
            _ => Ok(()),
        }
    }

    /// Unrounded close quantity for a position of `position_size` contracts.
    ///
    /// `mark_price` must be positive; it is only read by the notional policy.
    /// A quantity too large for `Decimal` is an `InvalidQuantity`.
    pub fn close_quantity(&self, position_size: Size, mark_price: Price) -> ValidationResult<Decimal> {
        let out_of_range = || {
            ValidationError::InvalidQuantity(format!(
                "close quantity for {self} is out of range at mark {mark_price}"
            ))
        };
        match *self {
            Self::AllOpen => Ok(position_size.inner()),
            Self::FixedQuantity(q) => Ok(q),
            Self::FixedNotionalUsd(u) => u.checked_div(mark_price.inner()).ok_or_else(out_of_range),
            Self::Percentage(p) => position_size
                .inner()
                .checked_mul(p)
                .map(|v| v / HUNDRED)
                .ok_or_else(out_of_range),
        }
    }
}

impl fmt::Display for CloseSizingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllOpen => write!(f, "all open"),
            Self::FixedQuantity(q) => write!(f, "{q} contracts"),
            Self::FixedNotionalUsd(u) => write!(f, "${u} notional"),
            Self::Percentage(p) => write!(f, "{p}%"),
        }
    }
}
