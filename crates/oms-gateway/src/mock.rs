//! Scripted in-memory exchange for tests.
//!
//! Holds positions, balances, mark prices and instrument filters behind
//! `parking_lot` locks. Records every call, and can be told to:
//! - reject orders on a symbol
//! - fail a whole operation
//! - add latency to every call
//! - enforce a minimum order notional
//!
//! Futures orders are filled immediately at the mark price.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use oms_core::{
    AccountSnapshot, AssetBalance, CancelAck, FuturesAccount, LeverageAck, OrderConfirmation,
    OrderSide, Position, Price, Size,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{GatewayError, GatewayResult, MIN_NOTIONAL_CODE};
use crate::gateway::{BoxFuture, ExchangeGateway, ExchangeSymbolInfo, OrderParams};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateOrder(OrderParams),
    CreateFuturesOrder(OrderParams),
    CancelOrder { symbol: String, order_id: u64 },
    CancelAllOpenOrders(String),
    FuturesExchangeInfo,
    FuturesMarkPrice(String),
    FuturesAccount,
    ChangeFuturesLeverage { symbol: String, leverage: u32 },
    Account,
    AssetBalance(String),
}

impl GatewayCall {
    /// Operation name, matching the trait method.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateOrder(_) => "create_order",
            Self::CreateFuturesOrder(_) => "create_futures_order",
            Self::CancelOrder { .. } => "cancel_order",
            Self::CancelAllOpenOrders(_) => "cancel_all_open_orders",
            Self::FuturesExchangeInfo => "futures_exchange_info",
            Self::FuturesMarkPrice(_) => "futures_mark_price",
            Self::FuturesAccount => "futures_account",
            Self::ChangeFuturesLeverage { .. } => "change_futures_leverage",
            Self::Account => "account",
            Self::AssetBalance(_) => "asset_balance",
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    symbols: Vec<ExchangeSymbolInfo>,
    mark_prices: HashMap<String, Price>,
    positions: Vec<Position>,
    balances: Vec<AssetBalance>,
    rejections: HashMap<String, GatewayError>,
    failing_operations: HashMap<&'static str, GatewayError>,
    min_notional: Option<Decimal>,
}

/// Mock exchange gateway.
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<MockState>,
    calls: Mutex<Vec<GatewayCall>>,
    latency: Mutex<Option<Duration>>,
    next_order_id: AtomicU64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
            next_order_id: AtomicU64::new(1),
        }
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// List a futures instrument in exchange info.
    pub fn add_symbol(&self, symbol: &str, step_size: Decimal, tick_size: Decimal) {
        let mut state = self.state.lock();
        state.symbols.retain(|s| s.symbol != symbol);
        state.symbols.push(ExchangeSymbolInfo {
            symbol: symbol.to_string(),
            step_size,
            tick_size,
        });
    }

    pub fn set_mark_price(&self, symbol: &str, price: Decimal) {
        self.state
            .lock()
            .mark_prices
            .insert(symbol.to_string(), Price::new(price));
    }

    /// Open (or replace) a futures position. The mark price is set too.
    pub fn set_position(&self, symbol: &str, amount: Decimal, mark_price: Decimal) {
        let mut state = self.state.lock();
        state
            .mark_prices
            .insert(symbol.to_string(), Price::new(mark_price));
        state.positions.retain(|p| p.symbol != symbol);
        state.positions.push(Position {
            symbol: symbol.to_string(),
            position_amt: amount,
            entry_price: Price::new(mark_price),
            leverage: 20,
            mark_price: Price::new(mark_price),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: None,
        });
    }

    /// Replace a whole position record.
    pub fn put_position(&self, position: Position) {
        let mut state = self.state.lock();
        state.positions.retain(|p| p.symbol != position.symbol);
        state.positions.push(position);
    }

    pub fn set_balance(&self, asset: &str, free: Decimal, locked: Decimal) {
        let mut state = self.state.lock();
        state.balances.retain(|b| b.asset != asset);
        state.balances.push(AssetBalance {
            asset: asset.to_string(),
            free,
            locked,
        });
    }

    /// Reject every order on `symbol` with `error`.
    pub fn reject_symbol(&self, symbol: &str, error: GatewayError) {
        self.state
            .lock()
            .rejections
            .insert(symbol.to_string(), error);
    }

    /// Make every call to `operation` fail with `error`.
    pub fn fail_operation(&self, operation: &'static str, error: GatewayError) {
        self.state
            .lock()
            .failing_operations
            .insert(operation, error);
    }

    /// Reject futures orders whose notional at mark is below `min_notional`.
    pub fn set_min_notional(&self, min_notional: Decimal) {
        self.state.lock().min_notional = Some(min_notional);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Number of calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Futures orders received, in arrival order.
    pub fn futures_orders(&self) -> Vec<OrderParams> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                GatewayCall::CreateFuturesOrder(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Spot orders received, in arrival order.
    pub fn spot_orders(&self) -> Vec<OrderParams> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                GatewayCall::CreateOrder(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn position_amount(&self, symbol: &str) -> Option<Decimal> {
        self.state
            .lock()
            .positions
            .iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.position_amt)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Record the call, apply latency, and return a scripted failure if any.
    async fn enter(&self, call: GatewayCall) -> GatewayResult<()> {
        let operation = call.operation();
        self.calls.lock().push(call);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.state.lock().failing_operations.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_order_id.fetch_add(1, Ordering::SeqCst)
    }

    fn confirm(&self, params: &OrderParams, status: &str) -> OrderConfirmation {
        OrderConfirmation {
            symbol: params.symbol.clone(),
            order_id: self.next_id(),
            client_order_id: None,
            side: params.side,
            order_type: params.order_type,
            status: status.to_string(),
            orig_qty: Size::new(params.quantity),
            price: params.price,
            reduce_only: params.reduce_only,
            update_time: 0,
        }
    }

    fn fill_futures(&self, params: &OrderParams) -> GatewayResult<OrderConfirmation> {
        let mut state = self.state.lock();
        if let Some(err) = state.rejections.get(&params.symbol) {
            return Err(err.clone());
        }
        if !state.symbols.iter().any(|s| s.symbol == params.symbol) {
            return Err(invalid_symbol());
        }
        let mark = state
            .mark_prices
            .get(&params.symbol)
            .copied()
            .unwrap_or(Price::ZERO);

        if let Some(min) = state.min_notional {
            if params.quantity * mark.inner() < min {
                return Err(GatewayError::api(
                    MIN_NOTIONAL_CODE,
                    format!(
                        "Order's notional must be no smaller than {min} (unless you choose reduce only)."
                    ),
                ));
            }
        }

        let delta = match params.side {
            OrderSide::Buy => params.quantity,
            OrderSide::Sell => -params.quantity,
        };
        let current = state
            .positions
            .iter()
            .find(|p| p.symbol == params.symbol)
            .map(|p| p.position_amt)
            .unwrap_or(Decimal::ZERO);

        if params.reduce_only {
            let reduces = !current.is_zero() && (current.is_sign_positive() != delta.is_sign_positive());
            if !reduces {
                return Err(GatewayError::api(-2022, "ReduceOnly Order is rejected."));
            }
        }

        // Reduce-only orders never flip the position.
        let mut next = current + delta;
        if params.reduce_only && (next.is_sign_positive() != current.is_sign_positive()) {
            next = Decimal::ZERO;
        }

        match state.positions.iter_mut().find(|p| p.symbol == params.symbol) {
            Some(position) => position.position_amt = next,
            None => state.positions.push(Position {
                symbol: params.symbol.clone(),
                position_amt: next,
                entry_price: mark,
                leverage: 20,
                mark_price: mark,
                unrealized_pnl: Decimal::ZERO,
                liquidation_price: None,
            }),
        }
        drop(state);

        Ok(self.confirm(params, "FILLED"))
    }
}

fn invalid_symbol() -> GatewayError {
    GatewayError::api(-1121, "Invalid symbol.")
}

impl ExchangeGateway for MockGateway {
    fn create_order(&self, params: OrderParams) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(async move {
            self.enter(GatewayCall::CreateOrder(params.clone())).await?;
            if let Some(err) = self.state.lock().rejections.get(&params.symbol) {
                return Err(err.clone());
            }
            Ok(self.confirm(&params, "NEW"))
        })
    }

    fn create_futures_order(
        &self,
        params: OrderParams,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(async move {
            self.enter(GatewayCall::CreateFuturesOrder(params.clone()))
                .await?;
            self.fill_futures(&params)
        })
    }

    fn cancel_order(
        &self,
        symbol: String,
        order_id: u64,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(async move {
            self.enter(GatewayCall::CancelOrder {
                symbol: symbol.clone(),
                order_id,
            })
            .await?;
            if let Some(err) = self.state.lock().rejections.get(&symbol) {
                return Err(err.clone());
            }
            Ok(OrderConfirmation {
                symbol,
                order_id,
                client_order_id: None,
                side: OrderSide::Buy,
                order_type: oms_core::OrderType::Limit,
                status: "CANCELED".to_string(),
                orig_qty: Size::ZERO,
                price: None,
                reduce_only: false,
                update_time: 0,
            })
        })
    }

    fn cancel_all_open_orders(&self, symbol: String) -> BoxFuture<'_, GatewayResult<CancelAck>> {
        Box::pin(async move {
            self.enter(GatewayCall::CancelAllOpenOrders(symbol.clone()))
                .await?;
            if let Some(err) = self.state.lock().rejections.get(&symbol) {
                return Err(err.clone());
            }
            Ok(CancelAck {
                symbol,
                message: "The operation of cancel all open order is done.".to_string(),
            })
        })
    }

    fn futures_exchange_info(&self) -> BoxFuture<'_, GatewayResult<Vec<ExchangeSymbolInfo>>> {
        Box::pin(async move {
            self.enter(GatewayCall::FuturesExchangeInfo).await?;
            Ok(self.state.lock().symbols.clone())
        })
    }

    fn futures_mark_price(&self, symbol: String) -> BoxFuture<'_, GatewayResult<Price>> {
        Box::pin(async move {
            self.enter(GatewayCall::FuturesMarkPrice(symbol.clone()))
                .await?;
            self.state
                .lock()
                .mark_prices
                .get(&symbol)
                .copied()
                .ok_or_else(invalid_symbol)
        })
    }

    fn futures_account(&self) -> BoxFuture<'_, GatewayResult<FuturesAccount>> {
        Box::pin(async move {
            self.enter(GatewayCall::FuturesAccount).await?;
            let state = self.state.lock();
            let positions = state
                .positions
                .iter()
                .map(|p| {
                    let mut p = p.clone();
                    if let Some(mark) = state.mark_prices.get(&p.symbol) {
                        p.mark_price = *mark;
                    }
                    p
                })
                .collect();
            Ok(FuturesAccount { positions })
        })
    }

    fn change_futures_leverage(
        &self,
        symbol: String,
        leverage: u32,
    ) -> BoxFuture<'_, GatewayResult<LeverageAck>> {
        Box::pin(async move {
            self.enter(GatewayCall::ChangeFuturesLeverage {
                symbol: symbol.clone(),
                leverage,
            })
            .await?;
            let mut state = self.state.lock();
            if let Some(err) = state.rejections.get(&symbol) {
                return Err(err.clone());
            }
            if !state.symbols.iter().any(|s| s.symbol == symbol) {
                return Err(invalid_symbol());
            }
            if let Some(position) = state.positions.iter_mut().find(|p| p.symbol == symbol) {
                position.leverage = leverage;
            }
            Ok(LeverageAck {
                symbol,
                leverage,
                max_notional_value: None,
            })
        })
    }

    fn account(&self) -> BoxFuture<'_, GatewayResult<AccountSnapshot>> {
        Box::pin(async move {
            self.enter(GatewayCall::Account).await?;
            Ok(AccountSnapshot {
                can_trade: true,
                balances: self.state.lock().balances.clone(),
            })
        })
    }

    fn asset_balance(&self, asset: String) -> BoxFuture<'_, GatewayResult<Option<AssetBalance>>> {
        Box::pin(async move {
            self.enter(GatewayCall::AssetBalance(asset.clone())).await?;
            Ok(self
                .state
                .lock()
                .balances
                .iter()
                .find(|b| b.asset == asset)
                .cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway() -> MockGateway {
        let mock = MockGateway::new();
        mock.add_symbol("BTCUSDT", dec!(0.001), dec!(0.1));
        mock.set_position("BTCUSDT", dec!(0.5), dec!(60000));
        mock
    }

    #[tokio::test]
    async fn test_reduce_only_fill_shrinks_position() {
        let mock = gateway();
        let conf = mock
            .create_futures_order(OrderParams::reduce_only_market(
                "BTCUSDT",
                OrderSide::Sell,
                dec!(0.2),
            ))
            .await
            .unwrap();
        assert_eq!(conf.status, "FILLED");
        assert_eq!(mock.position_amount("BTCUSDT"), Some(dec!(0.3)));
    }

    #[tokio::test]
    async fn test_reduce_only_never_flips() {
        let mock = gateway();
        mock.create_futures_order(OrderParams::reduce_only_market(
            "BTCUSDT",
            OrderSide::Sell,
            dec!(2),
        ))
        .await
        .unwrap();
        assert_eq!(mock.position_amount("BTCUSDT"), Some(Decimal::ZERO));

        let err = mock
            .create_futures_order(OrderParams::reduce_only_market(
                "BTCUSDT",
                OrderSide::Sell,
                dec!(0.1),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(-2022));
    }

    #[tokio::test]
    async fn test_min_notional_rejection() {
        let mock = gateway();
        mock.add_symbol("ETHUSDT", dec!(0.001), dec!(0.01));
        mock.set_position("ETHUSDT", dec!(0.001), dec!(3000));
        mock.set_min_notional(dec!(5));

        let err = mock
            .create_futures_order(OrderParams::reduce_only_market(
                "ETHUSDT",
                OrderSide::Sell,
                dec!(0.001),
            ))
            .await
            .unwrap_err();
        assert!(err.is_min_notional());
        assert_eq!(mock.position_amount("ETHUSDT"), Some(dec!(0.001)));
    }

    #[tokio::test]
    async fn test_failing_operation_and_call_log() {
        let mock = gateway();
        mock.fail_operation("futures_account", GatewayError::Transport("reset".into()));

        assert!(mock.futures_account().await.is_err());
        assert!(mock.futures_mark_price("BTCUSDT".into()).await.is_ok());
        assert_eq!(mock.call_count("futures_account"), 1);
        assert_eq!(
            mock.calls().last(),
            Some(&GatewayCall::FuturesMarkPrice("BTCUSDT".to_string()))
        );
    }
}
