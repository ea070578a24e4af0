//! Order router.
//!
//! Turns `OrderRequest`s into exchange-compliant orders and classifies every
//! result. Exchange rejections are returned as `OrderOutcome::Failure`; they
//! are never retried here. Only locally detected problems are `Err`.

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use oms_core::{
    BatchResult, CancelAck, LeverageAck, MarketKind, OrderConfirmation, OrderFailure,
    OrderOutcome, OrderRequest, OrderType, Price, QuantityUnit, ValidationError,
    ValidationResult,
};
use oms_gateway::{DynGateway, GatewayError, GatewayResult, OrderParams};
use oms_notify::Notifications;
use oms_registry::PrecisionResolver;
use oms_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::batch::OrderTable;
use crate::error::{ExecutorError, ExecutorResult};
use crate::locks::SymbolLocks;

/// Router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Batch rows in flight at once. 1 submits sequentially.
    pub batch_concurrency: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: 1,
        }
    }
}

/// Spot and futures order submission.
pub struct OrderRouter {
    gateway: DynGateway,
    precision: Arc<PrecisionResolver>,
    notifications: Notifications,
    locks: Arc<SymbolLocks>,
    config: RouterConfig,
}

impl OrderRouter {
    pub fn new(
        gateway: DynGateway,
        precision: Arc<PrecisionResolver>,
        notifications: Notifications,
        locks: Arc<SymbolLocks>,
        config: RouterConfig,
    ) -> Self {
        Self {
            gateway,
            precision,
            notifications,
            locks,
            config,
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Submit one order.
    ///
    /// `Err` only for local problems: a malformed request, an unknown symbol,
    /// unusable instrument filters, or a quantity below one step. Anything
    /// the gateway reports, including failed lookups, is a `Failure` outcome.
    pub async fn place_order(&self, request: &OrderRequest) -> ValidationResult<OrderOutcome> {
        if let Err(e) = request.validate() {
            return Err(self.refused(request, e).await);
        }
        let market = request.market_kind();
        let _guard = self.locks.lock(request.symbol()).await;

        let params = match self.prepare(request).await {
            Ok(params) => params,
            Err(ExecutorError::Validation(e)) => {
                return Err(self.refused(request, e).await);
            }
            Err(ExecutorError::Gateway(e)) => {
                return Ok(self.rejected(request, e).await);
            }
        };

        debug!(
            symbol = %params.symbol,
            side = %params.side,
            quantity = %params.quantity,
            market = market.as_str(),
            "Submitting order"
        );
        let started = Instant::now();
        let result = match market {
            MarketKind::Spot => self.gateway.create_order(params).await,
            MarketKind::Futures => self.gateway.create_futures_order(params).await,
        };
        Metrics::order_latency(market.as_str(), started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(confirmation) => Ok(self.placed(market, confirmation).await),
            Err(e) => Ok(self.rejected(request, e).await),
        }
    }

    /// Submit requests independently, in order.
    ///
    /// Never fails as a whole: a row refused locally becomes a `Validation`
    /// failure at its position. Outcomes mirror input order whatever the
    /// configured concurrency.
    pub async fn place_batch(&self, requests: Vec<OrderRequest>) -> BatchResult {
        if requests.is_empty() {
            return BatchResult::default();
        }
        let total = requests.len();

        let outcomes: Vec<OrderOutcome> = stream::iter(requests)
            .map(|request| async move {
                match self.place_order(&request).await {
                    Ok(outcome) => outcome,
                    Err(e) => OrderOutcome::Failure {
                        request,
                        error: OrderFailure::validation(e.to_string()),
                    },
                }
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let result = BatchResult { outcomes };
        info!(
            total,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "Batch complete"
        );
        result
    }

    /// Submit every row of a table.
    pub async fn place_table(&self, table: &OrderTable) -> BatchResult {
        self.place_batch(table.to_requests()).await
    }

    // =========================================================================
    // Leverage and cancels
    // =========================================================================

    /// Set futures leverage for `symbol`.
    ///
    /// Non-positive values fail locally. Upper bounds are the exchange's call.
    pub async fn change_leverage(&self, symbol: &str, leverage: i64) -> ExecutorResult<LeverageAck> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol.into());
        }
        let value = u32::try_from(leverage)
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ValidationError::InvalidLeverage(leverage))?;

        match self
            .gateway
            .change_futures_leverage(symbol.clone(), value)
            .await
        {
            Ok(ack) => {
                info!(%symbol, leverage = value, "Leverage changed");
                self.notifications
                    .send(format!(
                        "Leverage changed successfully for {symbol} to {value}x:\n{}",
                        to_json(&ack)
                    ))
                    .await;
                Ok(ack)
            }
            Err(e) => {
                warn!(%symbol, leverage = value, error = %e, "Leverage change failed");
                self.notifications
                    .send(format!(
                        "Failed to change leverage for {symbol} to {value}x: {e}"
                    ))
                    .await;
                Err(e.into())
            }
        }
    }

    /// Cancel one order. The outcome is reported either way.
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> GatewayResult<OrderConfirmation> {
        let symbol = symbol.trim().to_ascii_uppercase();
        match self.gateway.cancel_order(symbol.clone(), order_id).await {
            Ok(confirmation) => {
                info!(%symbol, order_id, "Order canceled");
                self.notifications
                    .send(format!("Order canceled successfully: {confirmation}"))
                    .await;
                Ok(confirmation)
            }
            Err(e) => {
                warn!(%symbol, order_id, error = %e, "Cancel failed");
                self.notifications
                    .send(format!(
                        "Failed to cancel order:\nSymbol: {symbol}, Order ID: {order_id}, Error: {e}"
                    ))
                    .await;
                Err(e)
            }
        }
    }

    /// Cancel every open order on `symbol`. The outcome is reported either way.
    pub async fn cancel_all_orders(&self, symbol: &str) -> GatewayResult<CancelAck> {
        let symbol = symbol.trim().to_ascii_uppercase();
        match self.gateway.cancel_all_open_orders(symbol.clone()).await {
            Ok(ack) => {
                info!(%symbol, "All open orders canceled");
                self.notifications
                    .send(format!(
                        "All orders canceled successfully for {symbol}: {}",
                        ack.message
                    ))
                    .await;
                Ok(ack)
            }
            Err(e) => {
                warn!(%symbol, error = %e, "Cancel-all failed");
                self.notifications
                    .send(format!("Failed to cancel all orders for {symbol}: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Build exchange-ready parameters. Futures orders are converted from
    /// notional if needed and floored to the instrument's filters; spot
    /// orders go out as given.
    async fn prepare(&self, request: &OrderRequest) -> ExecutorResult<OrderParams> {
        let mut params = OrderParams {
            symbol: request.symbol().to_string(),
            side: request.side(),
            order_type: request.order_type(),
            quantity: request.quantity(),
            price: match request.order_type() {
                OrderType::Limit => request.price(),
                OrderType::Market => None,
            },
            time_in_force: request.time_in_force(),
            reduce_only: false,
        };
        if request.market_kind() == MarketKind::Spot {
            return Ok(params);
        }

        let precision = self.precision.resolve(request.symbol()).await?;

        let raw_quantity = match request.quantity_unit() {
            QuantityUnit::Contracts => request.quantity(),
            QuantityUnit::NotionalUsd => {
                let mark = self.mark_price(request.symbol()).await?;
                let contracts = request.quantity().checked_div(mark.inner()).ok_or_else(|| {
                    ValidationError::InvalidQuantity(format!(
                        "{} notional {} is out of range at mark {mark}",
                        request.symbol(),
                        request.quantity()
                    ))
                })?;
                debug!(
                    symbol = %request.symbol(),
                    notional = %request.quantity(),
                    mark = %mark,
                    %contracts,
                    "Converted notional to contracts"
                );
                contracts
            }
        };

        let quantity = precision.round_quantity(raw_quantity)?;
        if quantity.is_zero() {
            return Err(ValidationError::QuantityBelowStep {
                symbol: precision.symbol.clone(),
                quantity: raw_quantity,
                step_size: precision.step_size,
            }
            .into());
        }
        params.quantity = quantity.inner();

        if let Some(price) = params.price {
            let rounded = precision.round_price(price)?;
            if !rounded.is_positive() {
                return Err(ValidationError::InvalidPrice(format!(
                    "{} price {price} is below tick size {}",
                    precision.symbol, precision.tick_size
                ))
                .into());
            }
            params.price = Some(rounded);
        }
        Ok(params)
    }

    async fn mark_price(&self, symbol: &str) -> GatewayResult<Price> {
        let mark = self.gateway.futures_mark_price(symbol.to_string()).await?;
        if mark.inner() <= Decimal::ZERO {
            return Err(GatewayError::InvalidResponse(format!(
                "non-positive mark price {mark} for {symbol}"
            )));
        }
        Ok(mark)
    }

    async fn placed(&self, market: MarketKind, confirmation: OrderConfirmation) -> OrderOutcome {
        Metrics::order(market.as_str(), "success");
        info!(
            symbol = %confirmation.symbol,
            side = %confirmation.side,
            order_id = confirmation.order_id,
            quantity = %confirmation.orig_qty,
            market = market.as_str(),
            "Order placed"
        );
        let text = match market {
            MarketKind::Spot => format!("Order placed successfully:\n{confirmation}"),
            MarketKind::Futures => format!("Futures order placed successfully:\n{confirmation}"),
        };
        self.notifications.send(text).await;
        OrderOutcome::Success(confirmation)
    }

    /// Report a local refusal and hand the error back.
    async fn refused(&self, request: &OrderRequest, error: ValidationError) -> ValidationError {
        Metrics::order(request.market_kind().as_str(), "validation");
        warn!(symbol = %request.symbol(), error = %error, "Order refused locally");
        self.report_failure(request, error.to_string()).await;
        error
    }

    async fn rejected(&self, request: &OrderRequest, error: GatewayError) -> OrderOutcome {
        let failure = error.to_failure();
        let market = request.market_kind();
        Metrics::order(market.as_str(), failure.kind.as_str());
        warn!(
            symbol = %request.symbol(),
            side = %request.side(),
            kind = %failure.kind,
            error = %error,
            "Order failed"
        );
        self.report_failure(request, error.to_string()).await;
        OrderOutcome::Failure {
            request: request.clone(),
            error: failure,
        }
    }

    async fn report_failure(&self, request: &OrderRequest, error: String) {
        let label = match request.market_kind() {
            MarketKind::Spot => "order",
            MarketKind::Futures => "futures order",
        };
        self.notifications
            .send(format!(
                "Failed to place {label}:\nSymbol: {}, Side: {}, Error: {error}",
                request.symbol(),
                request.side()
            ))
            .await;
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::{FailureKind, OrderSide};
    use oms_gateway::{GatewayCall, MockGateway, TimedGateway};
    use oms_notify::RecordingNotifier;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Harness {
        mock: Arc<MockGateway>,
        notifier: Arc<RecordingNotifier>,
        router: OrderRouter,
    }

    fn harness_with(concurrency: usize, timeout: Option<Duration>) -> Harness {
        let mock = Arc::new(MockGateway::new());
        mock.add_symbol("BTCUSDT", dec!(0.001), dec!(0.1));
        mock.add_symbol("ETHUSDT", dec!(0.001), dec!(0.01));
        mock.set_mark_price("BTCUSDT", dec!(50000));
        mock.set_mark_price("ETHUSDT", dec!(3000));

        let gateway: DynGateway = match timeout {
            Some(t) => Arc::new(TimedGateway::new(mock.clone(), t)),
            None => mock.clone(),
        };
        let notifier = Arc::new(RecordingNotifier::new());
        let router = OrderRouter::new(
            gateway.clone(),
            Arc::new(PrecisionResolver::new(gateway, Duration::from_secs(3600))),
            Notifications::new(notifier.clone(), Duration::from_secs(1)),
            Arc::new(SymbolLocks::new()),
            RouterConfig {
                batch_concurrency: concurrency,
            },
        );
        Harness {
            mock,
            notifier,
            router,
        }
    }

    fn harness() -> Harness {
        harness_with(1, None)
    }

    fn huge_quantity() -> Decimal {
        Decimal::from_i128_with_scale(10_i128.pow(27), 0)
    }

    // =========================================================================
    // place_order
    // =========================================================================

    #[tokio::test]
    async fn test_futures_quantity_is_floored() {
        let h = harness();
        let request =
            OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.12345)).into_futures();
        let outcome = h.router.place_order(&request).await.unwrap();

        assert!(outcome.is_success());
        let sent = &h.mock.futures_orders()[0];
        assert_eq!(sent.quantity, dec!(0.123));
        assert!(!sent.reduce_only);
        assert_eq!(h.notifier.matching("Futures order placed successfully").len(), 1);
    }

    #[tokio::test]
    async fn test_notional_converted_at_mark() {
        let h = harness();
        let request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(100))
            .into_futures()
            .into_notional_usd();
        h.router.place_order(&request).await.unwrap();

        assert_eq!(h.mock.futures_orders()[0].quantity, dec!(0.002));
    }

    #[tokio::test]
    async fn test_limit_futures_price_floored_and_gtc() {
        let h = harness();
        let request = OrderRequest::limit(
            "ETHUSDT",
            OrderSide::Sell,
            dec!(1.0005),
            Price::new(dec!(3001.237)),
        )
        .into_futures();
        h.router.place_order(&request).await.unwrap();

        let sent = &h.mock.futures_orders()[0];
        assert_eq!(sent.quantity, dec!(1.000));
        assert_eq!(sent.price, Some(Price::new(dec!(3001.23))));
        assert_eq!(sent.time_in_force, Some(oms_core::TimeInForce::GoodTillCancelled));
    }

    #[tokio::test]
    async fn test_spot_order_sent_as_given_without_price() {
        let h = harness();
        let request = OrderRequest::market("SOLUSDT", OrderSide::Buy, dec!(1.23456));
        h.router.place_order(&request).await.unwrap();

        let sent = &h.mock.spot_orders()[0];
        assert_eq!(sent.quantity, dec!(1.23456));
        assert_eq!(sent.price, None);
        assert_eq!(sent.time_in_force, None);
        assert_eq!(h.mock.call_count("futures_exchange_info"), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_a_failure_outcome() {
        let h = harness();
        h.mock
            .reject_symbol("BTCUSDT", GatewayError::api(-2019, "Margin is insufficient."));
        let request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(1)).into_futures();

        let outcome = h.router.place_order(&request).await.unwrap();
        match outcome {
            OrderOutcome::Failure { request: r, error } => {
                assert_eq!(r, request);
                assert_eq!(error.kind, FailureKind::Rejected);
                assert_eq!(error.code, Some(-2019));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // No automatic retry.
        assert_eq!(h.mock.futures_orders().len(), 1);
        assert_eq!(h.notifier.matching("Failed to place futures order").len(), 1);
    }

    #[tokio::test]
    async fn test_local_validation_never_reaches_gateway() {
        let h = harness();
        let below_step =
            OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.0004)).into_futures();
        assert!(matches!(
            h.router.place_order(&below_step).await,
            Err(ValidationError::QuantityBelowStep { .. })
        ));

        let unknown = OrderRequest::market("NOPEUSDT", OrderSide::Buy, dec!(1)).into_futures();
        assert_eq!(
            h.router.place_order(&unknown).await,
            Err(ValidationError::InstrumentNotFound("NOPEUSDT".to_string()))
        );

        let zero = OrderRequest::market("BTCUSDT", OrderSide::Buy, Decimal::ZERO);
        assert!(h.router.place_order(&zero).await.is_err());
        assert!(h.mock.futures_orders().is_empty());
        assert!(h.mock.spot_orders().is_empty());
    }

    #[tokio::test]
    async fn test_single_refusal_is_reported() {
        let h = harness();
        let unknown = OrderRequest::market("NOPEUSDT", OrderSide::Buy, dec!(1)).into_futures();
        assert!(h.router.place_order(&unknown).await.is_err());

        let zero = OrderRequest::market("BTCUSDT", OrderSide::Sell, Decimal::ZERO);
        assert!(h.router.place_order(&zero).await.is_err());

        assert_eq!(h.notifier.matching("Failed to place futures order").len(), 1);
        assert_eq!(h.notifier.matching("Failed to place order").len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_quantity_is_refused() {
        let h = harness();
        let huge = OrderRequest::market("BTCUSDT", OrderSide::Buy, huge_quantity()).into_futures();
        assert!(matches!(
            h.router.place_order(&huge).await,
            Err(ValidationError::InvalidQuantity(_))
        ));

        h.mock.set_mark_price("ETHUSDT", dec!(0.0000000000000000000001));
        let huge_notional = OrderRequest::market("ETHUSDT", OrderSide::Buy, huge_quantity())
            .into_futures()
            .into_notional_usd();
        assert!(matches!(
            h.router.place_order(&huge_notional).await,
            Err(ValidationError::InvalidQuantity(_))
        ));
        assert!(h.mock.futures_orders().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_row_does_not_sink_batch() {
        let h = harness();
        let requests = vec![
            OrderRequest::market("BTCUSDT", OrderSide::Buy, huge_quantity()).into_futures(),
            OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.001)).into_futures(),
        ];
        let result = h.router.place_batch(requests).await;
        assert_eq!(
            result.outcomes[0].failure().map(|f| f.kind),
            Some(FailureKind::Validation)
        );
        assert!(result.outcomes[1].is_success());
        // One report per failed row.
        assert_eq!(h.notifier.matching("Failed to place futures order").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mark_lookup_is_a_failure_outcome() {
        let h = harness();
        h.mock
            .fail_operation("futures_mark_price", GatewayError::Transport("reset".into()));
        let request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(100))
            .into_futures()
            .into_notional_usd();

        let outcome = h.router.place_order(&request).await.unwrap();
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Transport);
        assert!(h.mock.futures_orders().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let h = harness_with(1, Some(Duration::from_millis(20)));
        h.router
            .precision
            .refresh()
            .await
            .unwrap();
        h.mock.set_latency(Duration::from_millis(200));

        let request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(1)).into_futures();
        let outcome = h.router.place_order(&request).await.unwrap();
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Timeout);
    }

    // =========================================================================
    // place_batch
    // =========================================================================

    #[tokio::test]
    async fn test_empty_batch() {
        let h = harness();
        let (successes, failures) = h.router.place_table(&OrderTable::default()).await.split();
        assert!(successes.is_empty());
        assert!(failures.is_empty());
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_isolates_failing_row() {
        let h = harness();
        h.mock
            .reject_symbol("DOGEUSDT", GatewayError::api(-1013, "Filter failure: LOT_SIZE"));
        let requests = vec![
            OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.001)),
            OrderRequest::market("DOGEUSDT", OrderSide::Buy, dec!(1)),
            OrderRequest::market("ETHUSDT", OrderSide::Sell, dec!(0.01)),
            OrderRequest::market("BTCUSDT", OrderSide::Sell, Decimal::ZERO),
        ];

        let result = h.router.place_batch(requests).await;
        let kinds: Vec<_> = result
            .outcomes
            .iter()
            .map(|o| o.failure().map(|f| f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some(FailureKind::Rejected),
                None,
                Some(FailureKind::Validation)
            ]
        );

        let (successes, failures) = result.split();
        assert_eq!(successes.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[1].index, 3);
        // Every row after the failure was still attempted.
        assert_eq!(h.mock.spot_orders().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_batch_preserves_input_order() {
        let h = harness_with(4, None);
        h.mock.set_latency(Duration::from_millis(5));
        let symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "BNBUSDT"];
        let requests = symbols
            .iter()
            .map(|s| OrderRequest::market(s, OrderSide::Buy, dec!(1)))
            .collect();

        let (successes, failures) = h.router.place_batch(requests).await.split();
        assert!(failures.is_empty());
        let got: Vec<_> = successes.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(got, symbols);
    }

    // =========================================================================
    // Leverage and cancels
    // =========================================================================

    #[tokio::test]
    async fn test_non_positive_leverage_fails_locally() {
        let h = harness();
        for bad in [-1, 0] {
            assert_eq!(
                h.router.change_leverage("BTCUSDT", bad).await,
                Err(ExecutorError::Validation(ValidationError::InvalidLeverage(bad)))
            );
        }
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_leverage_change_reported() {
        let h = harness();
        let ack = h.router.change_leverage("btcusdt", 125).await.unwrap();
        assert_eq!(ack.leverage, 125);
        assert_eq!(
            h.mock.calls(),
            vec![GatewayCall::ChangeFuturesLeverage {
                symbol: "BTCUSDT".to_string(),
                leverage: 125
            }]
        );
        assert_eq!(h.notifier.matching("to 125x").len(), 1);

        let err = h.router.change_leverage("NOPEUSDT", 5).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Gateway(_)));
        assert_eq!(h.notifier.matching("Failed to change leverage").len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_failures_are_reported_not_fatal() {
        let h = harness();
        assert!(h.router.cancel_order("BTCUSDT", 42).await.is_ok());
        assert!(h.router.cancel_all_orders("BTCUSDT").await.is_ok());

        h.mock
            .reject_symbol("ETHUSDT", GatewayError::api(-2011, "Unknown order sent."));
        assert!(h.router.cancel_order("ETHUSDT", 7).await.is_err());
        assert!(h.router.cancel_all_orders("ETHUSDT").await.is_err());

        assert_eq!(h.notifier.matching("canceled successfully").len(), 2);
        assert_eq!(h.notifier.matching("Failed to cancel").len(), 2);
    }
}
