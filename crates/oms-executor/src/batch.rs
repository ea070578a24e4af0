//! Tabular batch input.
//!
//! A batch is an ordered table with the columns `Symbol, Side, Size, Price`.
//! Order type and market apply to the whole table.

use oms_core::{MarketKind, OrderRequest, OrderSide, OrderType, Price, QuantityUnit};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a batch table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Side")]
    pub side: OrderSide,
    #[serde(rename = "Size")]
    pub size: Decimal,
    /// Used by limit orders only.
    #[serde(rename = "Price", default)]
    pub price: Decimal,
}

impl OrderRow {
    pub fn new(symbol: impl Into<String>, side: OrderSide, size: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            price,
        }
    }

    /// Request for this row under the table's order type and market.
    pub fn to_request(&self, order_type: OrderType, market: MarketKind) -> OrderRequest {
        let price = match order_type {
            OrderType::Limit => Some(Price::new(self.price)),
            OrderType::Market => None,
        };
        OrderRequest::new(
            &self.symbol,
            self.side,
            order_type,
            market,
            self.size,
            QuantityUnit::Contracts,
            price,
        )
    }
}

/// An ordered batch of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTable {
    pub rows: Vec<OrderRow>,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub market: MarketKind,
}

impl OrderTable {
    /// Spot market-order table.
    pub fn new(rows: Vec<OrderRow>) -> Self {
        Self {
            rows,
            order_type: OrderType::Market,
            market: MarketKind::Spot,
        }
    }

    #[must_use]
    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    #[must_use]
    pub fn with_market(mut self, market: MarketKind) -> Self {
        self.market = market;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Requests in row order.
    pub fn to_requests(&self) -> Vec<OrderRequest> {
        self.rows
            .iter()
            .map(|row| row.to_request(self.order_type, self.market))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rows_deserialize_from_column_names() {
        let raw = r#"{
            "rows": [
                {"Symbol": "BTCUSDT", "Side": "BUY", "Size": "0.001", "Price": "20000"},
                {"Symbol": "ETHUSDT", "Side": "sell", "Size": "0.01", "Price": "1500"}
            ]
        }"#;
        let table: OrderTable = serde_json::from_str(raw).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].side, OrderSide::Sell);
        assert_eq!(table.order_type, OrderType::Market);
        assert_eq!(table.market, MarketKind::Spot);
    }

    #[test]
    fn test_market_rows_drop_price() {
        let table = OrderTable::new(vec![OrderRow::new(
            "btcusdt",
            OrderSide::Buy,
            dec!(0.001),
            dec!(20000),
        )]);
        let requests = table.to_requests();
        assert_eq!(requests[0].symbol(), "BTCUSDT");
        assert_eq!(requests[0].price(), None);
    }

    #[test]
    fn test_limit_rows_keep_price() {
        let table = OrderTable::new(vec![OrderRow::new(
            "ETHUSDT",
            OrderSide::Sell,
            dec!(0.01),
            dec!(1500),
        )])
        .with_order_type(OrderType::Limit)
        .with_market(MarketKind::Futures);

        let request = &table.to_requests()[0];
        assert_eq!(request.price(), Some(Price::new(dec!(1500))));
        assert_eq!(request.market_kind(), MarketKind::Futures);
    }

    #[test]
    fn test_empty_table() {
        assert!(OrderTable::default().to_requests().is_empty());
    }
}
