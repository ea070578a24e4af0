//! Order-related types.
//!
//! Provides order side, type, market, quantity unit and time-in-force enums,
//! the immutable `OrderRequest`, and the exchange acknowledgements.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValidationError, ValidationResult};
use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    #[serde(alias = "buy", alias = "Buy")]
    Buy,
    #[serde(alias = "sell", alias = "Sell")]
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Side of the order that reduces a position with the given signed amount.
    ///
    /// Long (positive) positions are closed by selling, short ones by buying.
    /// Returns `None` for a flat position.
    pub fn closing(signed_amount: Decimal) -> Option<Self> {
        if signed_amount.is_zero() {
            None
        } else if signed_amount.is_sign_positive() {
            Some(Self::Sell)
        } else {
            Some(Self::Buy)
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(ValidationError::InvalidSide(other.to_string())),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancelled. Every limit order this core sends uses it.
    #[default]
    #[serde(rename = "GTC")]
    GoodTillCancelled,
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    #[serde(rename = "FOK")]
    FillOrKill,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTillCancelled => write!(f, "GTC"),
            Self::ImmediateOrCancel => write!(f, "IOC"),
            Self::FillOrKill => write!(f, "FOK"),
        }
    }
}

/// Which market an order targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketKind {
    #[default]
    Spot,
    Futures,
}

impl MarketKind {
    /// Metric/log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Futures => "futures",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "SPOT"),
            Self::Futures => write!(f, "FUTURES"),
        }
    }
}

/// Unit the requested quantity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityUnit {
    /// Contracts / base-asset units.
    #[default]
    Contracts,
    /// Quote-currency notional, converted to contracts at the mark price.
    NotionalUsd,
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contracts => write!(f, "CONTRACTS"),
            Self::NotionalUsd => write!(f, "NOTIONAL_USD"),
        }
    }
}

/// A trading intent to be turned into an exchange-compliant order.
///
/// Immutable once constructed: fields are private and the `into_*`
/// adjusters consume the value. Symbols are normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    symbol: String,
    side: OrderSide,
    quantity: Decimal,
    price: Option<Price>,
    order_type: OrderType,
    market: MarketKind,
    quantity_unit: QuantityUnit,
}

impl OrderRequest {
    /// Create a request with every field given explicitly.
    pub fn new(
        symbol: impl AsRef<str>,
        side: OrderSide,
        order_type: OrderType,
        market: MarketKind,
        quantity: Decimal,
        quantity_unit: QuantityUnit,
        price: Option<Price>,
    ) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_ascii_uppercase(),
            side,
            quantity,
            price,
            order_type,
            market,
            quantity_unit,
        }
    }

    /// Spot market order sized in contracts.
    pub fn market(symbol: impl AsRef<str>, side: OrderSide, quantity: Decimal) -> Self {
        Self::new(
            symbol,
            side,
            OrderType::Market,
            MarketKind::Spot,
            quantity,
            QuantityUnit::Contracts,
            None,
        )
    }

    /// Spot limit order sized in contracts.
    pub fn limit(symbol: impl AsRef<str>, side: OrderSide, quantity: Decimal, price: Price) -> Self {
        Self::new(
            symbol,
            side,
            OrderType::Limit,
            MarketKind::Spot,
            quantity,
            QuantityUnit::Contracts,
            Some(price),
        )
    }

    /// Same request, routed to the futures market.
    #[must_use]
    pub fn into_futures(self) -> Self {
        Self {
            market: MarketKind::Futures,
            ..self
        }
    }

    /// Same request, with the quantity read as quote-currency notional.
    #[must_use]
    pub fn into_notional_usd(self) -> Self {
        Self {
            quantity_unit: QuantityUnit::NotionalUsd,
            ..self
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn price(&self) -> Option<Price> {
        self.price
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn market_kind(&self) -> MarketKind {
        self.market
    }

    pub fn quantity_unit(&self) -> QuantityUnit {
        self.quantity_unit
    }

    /// Time-in-force sent with this request: GTC for limits, none for markets.
    pub fn time_in_force(&self) -> Option<TimeInForce> {
        match self.order_type {
            OrderType::Limit => Some(TimeInForce::GoodTillCancelled),
            OrderType::Market => None,
        }
    }

    /// Local checks that need no exchange data.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidQuantity(format!(
                "{} quantity must be positive, got {}",
                self.symbol, self.quantity
            )));
        }
        if self.order_type == OrderType::Limit {
            match self.price {
                Some(price) if price.is_positive() => {}
                _ => {
                    return Err(ValidationError::InvalidPrice(format!(
                        "{} limit order requires a positive price",
                        self.symbol
                    )))
                }
            }
        }
        if self.quantity_unit == QuantityUnit::NotionalUsd && self.market != MarketKind::Futures {
            return Err(ValidationError::UnsupportedQuantityUnit {
                unit: self.quantity_unit.to_string(),
                market: self.market.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.market, self.order_type, self.side, self.quantity, self.symbol
        )?;
        if self.quantity_unit == QuantityUnit::NotionalUsd {
            write!(f, " (USD notional)")?;
        }
        if let Some(price) = self.price {
            write!(f, " @ {price}")?;
        }
        Ok(())
    }
}

/// Order acknowledgement returned by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: String,
    pub orig_qty: Size,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default)]
    pub reduce_only: bool,
    /// Exchange timestamp (Unix milliseconds).
    #[serde(default)]
    pub update_time: i64,
}

impl fmt::Display for OrderConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{} #{} {}", self.symbol, self.order_id, self.status),
        }
    }
}

/// Leverage change acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageAck {
    pub symbol: String,
    pub leverage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_notional_value: Option<Decimal>,
}

/// Cancel-all acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    pub symbol: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_closing_side_is_opposite_of_sign() {
        assert_eq!(OrderSide::closing(dec!(0.5)), Some(OrderSide::Sell));
        assert_eq!(OrderSide::closing(dec!(-100)), Some(OrderSide::Buy));
        assert_eq!(OrderSide::closing(Decimal::ZERO), None);
    }

    #[test]
    fn test_order_side_parse_and_serde() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" SELL ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());

        let side: OrderSide = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(side, OrderSide::Sell);
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), "\"BUY\"");
    }

    #[test]
    fn test_request_normalizes_symbol() {
        let req = OrderRequest::market(" btcusdt ", OrderSide::Buy, dec!(0.01));
        assert_eq!(req.symbol(), "BTCUSDT");
        assert_eq!(req.market_kind(), MarketKind::Spot);
        assert_eq!(req.time_in_force(), None);
    }

    #[test]
    fn test_limit_request_is_gtc() {
        let req = OrderRequest::limit("ETHUSDT", OrderSide::Sell, dec!(1), Price::new(dec!(1500)));
        assert_eq!(req.time_in_force(), Some(TimeInForce::GoodTillCancelled));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let zero_qty = OrderRequest::market("BTCUSDT", OrderSide::Buy, Decimal::ZERO);
        assert!(matches!(
            zero_qty.validate(),
            Err(ValidationError::InvalidQuantity(_))
        ));

        let empty = OrderRequest::market("  ", OrderSide::Buy, dec!(1));
        assert_eq!(empty.validate(), Err(ValidationError::EmptySymbol));

        let no_price = OrderRequest::new(
            "BTCUSDT",
            OrderSide::Buy,
            OrderType::Limit,
            MarketKind::Futures,
            dec!(1),
            QuantityUnit::Contracts,
            None,
        );
        assert!(matches!(
            no_price.validate(),
            Err(ValidationError::InvalidPrice(_))
        ));

        let spot_notional =
            OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(100)).into_notional_usd();
        assert!(matches!(
            spot_notional.validate(),
            Err(ValidationError::UnsupportedQuantityUnit { .. })
        ));
        assert!(spot_notional.into_futures().validate().is_ok());
    }

    #[test]
    fn test_confirmation_json_shape() {
        let conf = OrderConfirmation {
            symbol: "BTCUSDT".to_string(),
            order_id: 42,
            client_order_id: None,
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            status: "NEW".to_string(),
            orig_qty: Size::new(dec!(0.5)),
            price: None,
            reduce_only: true,
            update_time: 0,
        };
        let json = conf.to_string();
        assert!(json.contains("\"orderId\":42"));
        assert!(json.contains("\"type\":\"MARKET\""));
        assert!(json.contains("\"reduceOnly\":true"));
    }
}
