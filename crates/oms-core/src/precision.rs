//! Instrument precision filters and exchange-compliant rounding.
//!
//! Quantities and prices are floored to the instrument's step/tick size so an
//! order can never exceed what the caller asked for.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::{Price, Size};

/// Step and tick filters for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentPrecision {
    pub symbol: String,
    /// Minimum quantity increment.
    pub step_size: Decimal,
    /// Minimum price increment.
    pub tick_size: Decimal,
}

impl InstrumentPrecision {
    /// Build a precision spec, rejecting zero or negative increments.
    pub fn new(
        symbol: impl Into<String>,
        step_size: Decimal,
        tick_size: Decimal,
    ) -> ValidationResult<Self> {
        let symbol = symbol.into();
        check_increment(&symbol, "stepSize", step_size)?;
        check_increment(&symbol, "tickSize", tick_size)?;
        Ok(Self {
            symbol,
            step_size,
            tick_size,
        })
    }

    /// Decimal places of a rounded quantity.
    pub fn quantity_decimals(&self) -> u32 {
        decimals_for_increment(self.step_size)
    }

    /// Decimal places of a rounded price.
    pub fn price_decimals(&self) -> u32 {
        decimals_for_increment(self.tick_size)
    }

    /// Floor a quantity to the step size.
    pub fn round_quantity(&self, quantity: Decimal) -> ValidationResult<Size> {
        floor_to_increment(&self.symbol, quantity, self.step_size).map(Size::new)
    }

    /// Floor a price to the tick size.
    pub fn round_price(&self, price: Price) -> ValidationResult<Price> {
        floor_to_increment(&self.symbol, price.inner(), self.tick_size).map(Price::new)
    }

    /// True when both filters equal the other spec's filters.
    pub fn same_filters(&self, other: &Self) -> bool {
        self.step_size == other.step_size && self.tick_size == other.tick_size
    }
}

fn check_increment(symbol: &str, name: &str, increment: Decimal) -> ValidationResult<()> {
    if increment <= Decimal::ZERO {
        return Err(ValidationError::InvalidInstrumentFilter {
            symbol: symbol.to_string(),
            reason: format!("{name} must be positive, got {increment}"),
        });
    }
    Ok(())
}

/// Decimal places implied by an increment's magnitude.
///
/// - 0.001 -> 3
/// - 0.5 -> 1
/// - 1 -> 0
/// - 10 -> 0
pub fn decimals_for_increment(increment: Decimal) -> u32 {
    increment.normalize().scale()
}

/// Floor `value` to the nearest multiple of `increment` at or below it.
///
/// The result carries exactly the decimal places implied by the increment.
pub fn floor_to_increment(
    symbol: &str,
    value: Decimal,
    increment: Decimal,
) -> ValidationResult<Decimal> {
    check_increment(symbol, "increment", increment)?;
    let out_of_range = || {
        ValidationError::InvalidQuantity(format!(
            "{symbol} value {value} is out of range at increment {increment}"
        ))
    };
    let steps = value.checked_div(increment).ok_or_else(out_of_range)?.floor();
    let mut rounded = steps.checked_mul(increment).ok_or_else(out_of_range)?;
    rounded.rescale(decimals_for_increment(increment));
    Ok(rounded)
}
