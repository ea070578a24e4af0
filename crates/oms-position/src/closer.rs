//! Futures position closer.
//!
//! A sweep reads the account once to find open positions. For each symbol it
//! then takes the symbol lock, re-reads the position, sizes the close and
//! sends a reduce-only MARKET order on the opposite side.
//!
//! Each position ends in exactly one of three states:
//! - `Closed`: the order was accepted
//! - `Unclosable`: the exchange refused it as below minimum notional
//! - `Failed`: anything else
//!
//! A close quantity that floors to zero at the step size, or cannot be
//! represented, is `Failed` with a validation error and no order is sent.
//! This includes positions smaller than one step, which therefore never
//! reach the exchange's minimum-notional check.
//!
//! One position failing never stops the sweep.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use oms_core::{CloseOutcome, CloseReport, FailureKind, OrderFailure, Position, Price, Size};
use oms_executor::SymbolLocks;
use oms_gateway::{DynGateway, OrderParams};
use oms_notify::Notifications;
use oms_registry::{PrecisionResolver, RegistryError};
use oms_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::PositionResult;
use crate::query::format_usd;
use crate::sizing::CloseSizingPolicy;

/// Closer settings.
#[derive(Debug, Clone)]
pub struct CloserConfig {
    /// Exchange minimum order notional, in quote currency.
    pub min_notional: Decimal,
    /// Clamp a close quantity larger than the position down to the position.
    pub clamp_over_close: bool,
    /// Positions closed at once. 1 closes sequentially.
    pub concurrency: usize,
}

impl Default for CloserConfig {
    fn default() -> Self {
        Self {
            min_notional: Decimal::from(5),
            clamp_over_close: false,
            concurrency: 1,
        }
    }
}

/// Reduce-only close sweeps over open futures positions.
pub struct PositionCloser {
    gateway: DynGateway,
    precision: Arc<PrecisionResolver>,
    notifications: Notifications,
    locks: Arc<SymbolLocks>,
    config: CloserConfig,
}

impl PositionCloser {
    pub fn new(
        gateway: DynGateway,
        precision: Arc<PrecisionResolver>,
        notifications: Notifications,
        locks: Arc<SymbolLocks>,
        config: CloserConfig,
    ) -> Self {
        Self {
            gateway,
            precision,
            notifications,
            locks,
            config,
        }
    }

    /// Close open positions, all of them or only `symbol`'s.
    ///
    /// `Err` for a malformed policy (before any network call) or when the
    /// account cannot be read at all.
    pub async fn close_positions(
        &self,
        symbol: Option<&str>,
        policy: CloseSizingPolicy,
    ) -> PositionResult<CloseReport> {
        policy.validate()?;
        let filter = symbol.map(|s| s.trim().to_ascii_uppercase());

        let account = match self.gateway.futures_account().await {
            Ok(account) => account,
            Err(e) => {
                warn!(error = %e, "Futures account fetch failed");
                self.notifications
                    .send(format!("Failed to fetch positions: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        let mut targets: Vec<String> = Vec::new();
        for position in account.open_positions() {
            let matches = filter
                .as_deref()
                .map_or(true, |f| position.symbol.eq_ignore_ascii_case(f));
            if matches && !targets.contains(&position.symbol) {
                targets.push(position.symbol.clone());
            }
        }
        info!(
            positions = targets.len(),
            %policy,
            symbol = filter.as_deref().unwrap_or("*"),
            "Closing futures positions"
        );

        let outcomes: Vec<CloseOutcome> = stream::iter(targets)
            .map(|symbol| self.close_one(symbol, policy))
            .buffered(self.config.concurrency.max(1))
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;
        let report = CloseReport { outcomes };

        let unclosable: Vec<String> = report
            .unclosable()
            .map(|(symbol, notional)| format!("{symbol}: notional {}", format_usd(notional)))
            .collect();
        if !unclosable.is_empty() {
            self.notifications
                .send(format!("Unclosable positions:\n{}", unclosable.join("\n")))
                .await;
        }

        info!(
            closed = report.closed().count(),
            failed = report.failed().count(),
            unclosable = unclosable.len(),
            "Close sweep complete"
        );
        Ok(report)
    }

    /// Close one symbol under its lock. `None` if it went flat meanwhile.
    async fn close_one(&self, symbol: String, policy: CloseSizingPolicy) -> Option<CloseOutcome> {
        let _guard = self.locks.lock(&symbol).await;

        let position = match self.gateway.futures_account().await {
            Ok(account) => match account.position(&symbol) {
                Some(p) if p.is_open() => p.clone(),
                _ => {
                    debug!(%symbol, "Position already flat, skipping");
                    return None;
                }
            },
            Err(e) => return Some(self.failed(symbol, e.to_failure()).await),
        };

        let outcome = match self.submit_close(&position, policy).await {
            Ok(outcome) => outcome,
            Err(failure) => self.failed(symbol, failure).await,
        };
        Some(outcome)
    }

    async fn submit_close(
        &self,
        position: &Position,
        policy: CloseSizingPolicy,
    ) -> Result<CloseOutcome, OrderFailure> {
        let symbol = position.symbol.clone();

        let mark = self
            .gateway
            .futures_mark_price(symbol.clone())
            .await
            .map_err(|e| e.to_failure())?;
        if mark.inner() <= Decimal::ZERO {
            return Err(OrderFailure::new(
                FailureKind::Transport,
                format!("non-positive mark price {mark} for {symbol}"),
            ));
        }

        let size = position.size();
        let notional = position.notional(mark);
        let Some(side) = position.closing_side() else {
            return Err(OrderFailure::validation(format!("{symbol} has no open position")));
        };

        let quantity = self.sized(&symbol, policy, size, mark)?;
        if notional < self.config.min_notional {
            debug!(
                %symbol,
                notional = %notional,
                min_notional = %self.config.min_notional,
                "Position below minimum notional, attempting reduce-only close"
            );
        }

        let precision = self.precision.resolve(&symbol).await.map_err(|e| match e {
            RegistryError::Validation(v) => OrderFailure::validation(v.to_string()),
            RegistryError::Gateway(g) => g.to_failure(),
        })?;
        let rounded = precision
            .round_quantity(quantity)
            .map_err(|e| OrderFailure::validation(e.to_string()))?;
        if rounded.is_zero() {
            return Err(OrderFailure::validation(format!(
                "Close quantity {quantity} for {symbol} rounds to zero at step size {}",
                precision.step_size
            )));
        }

        info!(
            %symbol,
            %side,
            quantity = %rounded,
            notional = %notional,
            "Submitting reduce-only close"
        );
        let params = OrderParams::reduce_only_market(symbol.clone(), side, rounded.inner());
        match self.gateway.create_futures_order(params).await {
            Ok(order) => {
                Metrics::close_outcome("closed");
                let text = if notional < self.config.min_notional {
                    format!("Closed small position for {symbol} using reduceOnly: {order}")
                } else {
                    format!("Closed position for {symbol}: {order}")
                };
                self.notifications.send(text).await;
                Ok(CloseOutcome::Closed { symbol, order })
            }
            Err(e) if e.is_min_notional() => {
                Metrics::close_outcome("unclosable");
                warn!(%symbol, notional = %notional, error = %e, "Position unclosable");
                Ok(CloseOutcome::Unclosable {
                    symbol,
                    notional_value: notional,
                })
            }
            Err(e) => Err(e.to_failure()),
        }
    }

    /// Policy quantity, with the over-close check.
    fn sized(
        &self,
        symbol: &str,
        policy: CloseSizingPolicy,
        size: Size,
        mark: Price,
    ) -> Result<Decimal, OrderFailure> {
        let quantity = policy
            .close_quantity(size, mark)
            .map_err(|e| OrderFailure::validation(e.to_string()))?;
        if quantity > size.inner() {
            warn!(
                %symbol,
                close_quantity = %quantity,
                position_size = %size,
                clamped = self.config.clamp_over_close,
                "Close quantity exceeds open position size"
            );
            if self.config.clamp_over_close {
                return Ok(size.inner());
            }
        }
        Ok(quantity)
    }

    async fn failed(&self, symbol: String, error: OrderFailure) -> CloseOutcome {
        Metrics::close_outcome("failed");
        warn!(%symbol, kind = %error.kind, error = %error, "Close failed");
        self.notifications
            .send(format!("Failed to close position for {symbol}: {error}"))
            .await;
        CloseOutcome::Failed { symbol, error }
    }
}
