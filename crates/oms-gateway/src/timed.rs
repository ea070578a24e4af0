//! Deadline decorator.
//!
//! Wraps any gateway so that every call resolves within a fixed deadline.
//! A call that overruns yields `GatewayError::Timeout`. The underlying request
//! is dropped, so whether the exchange processed it is unknown.

use std::future::Future;
use std::time::Duration;

use oms_core::{
    AccountSnapshot, AssetBalance, CancelAck, FuturesAccount, LeverageAck, OrderConfirmation,
    Price,
};
use oms_telemetry::Metrics;
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, DynGateway, ExchangeGateway, ExchangeSymbolInfo, OrderParams};

/// Gateway decorator applying a per-call deadline.
pub struct TimedGateway {
    inner: DynGateway,
    timeout: Duration,
}

impl TimedGateway {
    pub fn new(inner: DynGateway, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn deadline<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                Metrics::gateway_timeout(operation);
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Gateway call exceeded deadline"
                );
                Err(GatewayError::Timeout {
                    operation: operation.to_string(),
                    after: self.timeout,
                })
            }
        }
    }
}

impl ExchangeGateway for TimedGateway {
    fn create_order(&self, params: OrderParams) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(self.deadline("create_order", self.inner.create_order(params)))
    }

    fn create_futures_order(
        &self,
        params: OrderParams,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(self.deadline(
            "create_futures_order",
            self.inner.create_futures_order(params),
        ))
    }

    fn cancel_order(
        &self,
        symbol: String,
        order_id: u64,
    ) -> BoxFuture<'_, GatewayResult<OrderConfirmation>> {
        Box::pin(self.deadline("cancel_order", self.inner.cancel_order(symbol, order_id)))
    }

    fn cancel_all_open_orders(&self, symbol: String) -> BoxFuture<'_, GatewayResult<CancelAck>> {
        Box::pin(self.deadline(
            "cancel_all_open_orders",
            self.inner.cancel_all_open_orders(symbol),
        ))
    }

    fn futures_exchange_info(&self) -> BoxFuture<'_, GatewayResult<Vec<ExchangeSymbolInfo>>> {
        Box::pin(self.deadline(
            "futures_exchange_info",
            self.inner.futures_exchange_info(),
        ))
    }

    fn futures_mark_price(&self, symbol: String) -> BoxFuture<'_, GatewayResult<Price>> {
        Box::pin(self.deadline(
            "futures_mark_price",
            self.inner.futures_mark_price(symbol),
        ))
    }

    fn futures_account(&self) -> BoxFuture<'_, GatewayResult<FuturesAccount>> {
        Box::pin(self.deadline("futures_account", self.inner.futures_account()))
    }

    fn change_futures_leverage(
        &self,
        symbol: String,
        leverage: u32,
    ) -> BoxFuture<'_, GatewayResult<LeverageAck>> {
        Box::pin(self.deadline(
            "change_futures_leverage",
            self.inner.change_futures_leverage(symbol, leverage),
        ))
    }

    fn account(&self) -> BoxFuture<'_, GatewayResult<AccountSnapshot>> {
        Box::pin(self.deadline("account", self.inner.account()))
    }

    fn asset_balance(&self, asset: String) -> BoxFuture<'_, GatewayResult<Option<AssetBalance>>> {
        Box::pin(self.deadline("asset_balance", self.inner.asset_balance(asset)))
    }
}
