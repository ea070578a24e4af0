//! Account and position state as reported by the exchange.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::OrderSide;
use crate::{Price, Size};

/// A futures position.
///
/// The sign of `position_amt` is the direction: positive is long,
/// negative is short, zero means no open position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub position_amt: Decimal,
    pub entry_price: Price,
    pub leverage: u32,
    #[serde(default = "zero_price")]
    pub mark_price: Price,
    #[serde(rename = "unrealizedProfit", default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub liquidation_price: Option<Price>,
}

fn zero_price() -> Price {
    Price::ZERO
}

impl Position {
    /// Whether the position holds a non-zero amount.
    pub fn is_open(&self) -> bool {
        !self.position_amt.is_zero()
    }

    /// Unsigned position size.
    pub fn size(&self) -> Size {
        Size::from_signed(self.position_amt)
    }

    /// Side of an order that reduces this position.
    pub fn closing_side(&self) -> Option<OrderSide> {
        OrderSide::closing(self.position_amt)
    }

    /// Notional value at the given mark price.
    pub fn notional(&self, mark_price: Price) -> Decimal {
        self.size().notional(mark_price)
    }
}

/// Futures account state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuturesAccount {
    pub positions: Vec<Position>,
}

impl FuturesAccount {
    /// Positions with a non-zero amount, in exchange order.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    /// Position for a symbol (case-insensitive), open or not.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Spot balance of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Spot account summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(default)]
    pub can_trade: bool,
    pub balances: Vec<AssetBalance>,
}

impl AccountSnapshot {
    /// Balances with a positive free amount.
    pub fn holdings(&self) -> Vec<AssetBalance> {
        self.balances
            .iter()
            .filter(|b| b.free > Decimal::ZERO)
            .cloned()
            .collect()
    }
}

/// Display projection of an open futures position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub symbol: String,
    /// Signed size in contracts.
    pub size: Decimal,
    pub notional_usd: Decimal,
    pub entry_price: Price,
    pub mark_price: Price,
    pub unrealized_pnl: Decimal,
    /// Absent when the exchange reports none.
    pub liquidation_price: Option<Price>,
    pub leverage: u32,
}

impl PositionView {
    pub fn new(position: &Position, mark_price: Price) -> Self {
        Self {
            symbol: position.symbol.clone(),
            size: position.position_amt,
            notional_usd: position.notional(mark_price),
            entry_price: position.entry_price,
            mark_price,
            unrealized_pnl: position.unrealized_pnl,
            // Exchanges report "0" for positions without a liquidation level.
            liquidation_price: position.liquidation_price.filter(|p| p.is_positive()),
            leverage: position.leverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, amt: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            position_amt: amt,
            entry_price: Price::new(dec!(100)),
            leverage: 10,
            mark_price: Price::new(dec!(100)),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: None,
        }
    }

    #[test]
    fn test_position_direction() {
        let long = position("BTCUSDT", dec!(0.5));
        let short = position("ADAUSDT", dec!(-100));
        let flat = position("ETHUSDT", Decimal::ZERO);

        assert_eq!(long.closing_side(), Some(OrderSide::Sell));
        assert_eq!(short.closing_side(), Some(OrderSide::Buy));
        assert_eq!(flat.closing_side(), None);
        assert!(!flat.is_open());
        assert_eq!(short.size(), Size::new(dec!(100)));
        assert_eq!(short.notional(Price::new(dec!(0.4))), dec!(40));
    }

    #[test]
    fn test_open_positions_filter() {
        let account = FuturesAccount {
            positions: vec![
                position("BTCUSDT", dec!(0.5)),
                position("ETHUSDT", Decimal::ZERO),
                position("ADAUSDT", dec!(-100)),
            ],
        };
        let symbols: Vec<_> = account.open_positions().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ADAUSDT"]);
        assert!(account.position("ethusdt").is_some());
    }

    #[test]
    fn test_position_wire_names() {
        let raw = r#"{
            "symbol": "BTCUSDT",
            "positionAmt": "0.500",
            "entryPrice": "58000.0",
            "leverage": 20,
            "markPrice": "60000",
            "unrealizedProfit": "1000",
            "liquidationPrice": null
        }"#;
        let pos: Position = serde_json::from_str(raw).unwrap();
        assert_eq!(pos.position_amt, dec!(0.5));
        assert_eq!(pos.unrealized_pnl, dec!(1000));
        assert!(pos.liquidation_price.is_none());
    }

    #[test]
    fn test_view_hides_zero_liquidation_price() {
        let mut pos = position("BTCUSDT", dec!(1));
        pos.liquidation_price = Some(Price::ZERO);
        let view = PositionView::new(&pos, Price::new(dec!(110)));
        assert_eq!(view.liquidation_price, None);
        assert_eq!(view.notional_usd, dec!(110));
    }

    #[test]
    fn test_holdings_only_positive_free() {
        let snapshot = AccountSnapshot {
            can_trade: true,
            balances: vec![
                AssetBalance {
                    asset: "USDT".to_string(),
                    free: dec!(100),
                    locked: Decimal::ZERO,
                },
                AssetBalance {
                    asset: "BNB".to_string(),
                    free: Decimal::ZERO,
                    locked: dec!(1),
                },
            ],
        };
        let holdings = snapshot.holdings();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].asset, "USDT");
    }
}
