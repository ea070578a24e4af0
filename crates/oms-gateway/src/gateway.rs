//! Exchange gateway trait.
//!
//! Object-safe so it can be shared as `Arc<dyn ExchangeGateway>`:
//! - production transports
//! - the deadline decorator
//! - the scripted mock used in tests

use std::pin::Pin;
use std::sync::Arc;

use oms_core::{
    AccountSnapshot, AssetBalance, CancelAck, FuturesAccount, LeverageAck, OrderConfirmation,
    OrderSide, OrderType, Price, TimeInForce,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Exchange-ready order parameters.
///
/// Quantities and prices are already rounded; the gateway sends them as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reduce_only: bool,
}

impl OrderParams {
    /// Market order that can only shrink an existing position.
    pub fn reduce_only_market(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
            reduce_only: true,
        }
    }
}

/// Quantity and price filters of one futures instrument, as listed by exchange info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSymbolInfo {
    pub symbol: String,
    pub step_size: Decimal,
    pub tick_size: Decimal,
}

/// Capability set the order management core consumes from the exchange.
///
/// Every method returns the raw exchange answer. Error classification is
/// done by callers through `GatewayError`.
pub trait ExchangeGateway: Send + Sync {
    /// Place a spot order.
    fn create_order(&self, params: OrderParams) -> BoxFuture<'_, GatewayResult<OrderConfirmation>>;

    /// Place a USD-M futures order.
    fn create_futures_order(
        &self,
        params: OrderParams,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>>;

    /// Cancel one spot order.
    fn cancel_order(
        &self,
        symbol: String,
        order_id: u64,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>>;

    /// Cancel every open spot order on a symbol.
    fn cancel_all_open_orders(&self, symbol: String) -> BoxFuture<'_, GatewayResult<CancelAck>>;

    /// Futures instrument filters.
    fn futures_exchange_info(&self) -> BoxFuture<'_, GatewayResult<Vec<ExchangeSymbolInfo>>>;

    /// Current futures mark price.
    fn futures_mark_price(&self, symbol: String) -> BoxFuture<'_, GatewayResult<Price>>;

    /// Futures account, including flat positions.
    fn futures_account(&self) -> BoxFuture<'_, GatewayResult<FuturesAccount>>;

    fn change_futures_leverage(
        &self,
        symbol: String,
        leverage: u32,
    ) -> BoxFuture<'_, GatewayResult<LeverageAck>>;

    /// Spot account summary.
    fn account(&self) -> BoxFuture<'_, GatewayResult<AccountSnapshot>>;

    /// Spot balance of one asset. `None` when the account never held it.
    fn asset_balance(&self, asset: String) -> BoxFuture<'_, GatewayResult<Option<AssetBalance>>>;
}

/// Arc wrapper for gateway trait objects.
pub type DynGateway = Arc<dyn ExchangeGateway>;
