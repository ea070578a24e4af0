//! Order management capability and its default implementation.

use std::pin::Pin;
use std::sync::Arc;

use oms_core::{
    AccountSnapshot, AssetBalance, BatchResult, CancelAck, CloseReport, LeverageAck,
    OrderConfirmation, OrderFailure, OrderOutcome, OrderRequest, PositionView,
};
use oms_executor::{OrderRouter, OrderTable, SymbolLocks};
use oms_gateway::{DynGateway, TimedGateway};
use oms_notify::{DynNotifier, LogNotifier, Notifications, TelegramNotifier};
use oms_position::{AccountQueries, CloseSizingPolicy, PositionCloser};
use oms_registry::PrecisionResolver;
use tracing::info;

use crate::audit::{AuditEvent, AuditLog};
use crate::config::OmsConfig;
use crate::error::OmsResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Everything the order management core offers its callers.
///
/// Exchange-side rejections come back as outcomes (`OrderOutcome`,
/// `BatchResult`, `CloseReport`); `Err` means the call itself could not be
/// carried out.
pub trait OrderManagement: Send + Sync {
    /// Submit one spot or futures order.
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, OmsResult<OrderOutcome>>;

    /// Submit every row of a table. Outcomes follow row order.
    fn place_batch(&self, table: OrderTable) -> BoxFuture<'_, BatchResult>;

    fn change_leverage(&self, symbol: String, leverage: i64)
        -> BoxFuture<'_, OmsResult<LeverageAck>>;

    fn cancel_order(
        &self,
        symbol: String,
        order_id: u64,
    ) -> BoxFuture<'_, OmsResult<OrderConfirmation>>;

    fn cancel_all_orders(&self, symbol: String) -> BoxFuture<'_, OmsResult<CancelAck>>;

    /// Reduce-only close sweep over open futures positions.
    fn close_positions(
        &self,
        symbol: Option<String>,
        policy: CloseSizingPolicy,
    ) -> BoxFuture<'_, OmsResult<CloseReport>>;

    /// Spot holdings with a positive free balance.
    fn get_positions(&self) -> BoxFuture<'_, OmsResult<Vec<AssetBalance>>>;

    fn get_account_summary(&self) -> BoxFuture<'_, OmsResult<AccountSnapshot>>;

    fn get_available_balance(&self, asset: String)
        -> BoxFuture<'_, OmsResult<Option<AssetBalance>>>;

    fn view_open_futures_positions(&self) -> BoxFuture<'_, OmsResult<Vec<PositionView>>>;
}

/// Arc wrapper for OrderManagement trait objects.
pub type DynOrderManagement = Arc<dyn OrderManagement>;

/// Default `OrderManagement` over one exchange gateway.
pub struct OrderManager {
    precision: Arc<PrecisionResolver>,
    router: OrderRouter,
    closer: PositionCloser,
    queries: AccountQueries,
    audit: Arc<AuditLog>,
}

impl OrderManager {
    /// Build every component from `config`.
    ///
    /// The gateway is wrapped in a deadline decorator; the router and closer
    /// share one precision cache and one set of symbol locks.
    pub fn new(config: OmsConfig, gateway: DynGateway, notifier: DynNotifier) -> OmsResult<Self> {
        config.validate()?;

        let gateway: DynGateway = Arc::new(TimedGateway::new(gateway, config.request_timeout()));
        let precision = Arc::new(PrecisionResolver::new(
            gateway.clone(),
            config.precision_max_age(),
        ));
        let notifications = Notifications::new(notifier, config.notify_timeout());
        let locks = Arc::new(SymbolLocks::new());
        let audit = Arc::new(match config.audit.capacity {
            Some(capacity) => AuditLog::with_capacity(capacity),
            None => AuditLog::new(),
        });

        let router = OrderRouter::new(
            gateway.clone(),
            precision.clone(),
            notifications.clone(),
            locks.clone(),
            config.router_config(),
        );
        let closer = PositionCloser::new(
            gateway.clone(),
            precision.clone(),
            notifications.clone(),
            locks,
            config.closer_config(),
        );
        let queries = AccountQueries::new(gateway, notifications);

        info!(
            request_timeout_ms = config.gateway.request_timeout_ms,
            batch_concurrency = config.router.batch_concurrency,
            close_concurrency = config.closer.concurrency,
            "Order manager ready"
        );

        Ok(Self {
            precision,
            router,
            closer,
            queries,
            audit,
        })
    }

    /// Like `new`, with the notifier chosen by `config.notifier`.
    pub fn from_config(config: OmsConfig, gateway: DynGateway) -> OmsResult<Self> {
        let notifier: DynNotifier = match &config.notifier.telegram {
            Some(telegram) => Arc::new(TelegramNotifier::new(telegram.clone())),
            None => Arc::new(LogNotifier),
        };
        Self::new(config, gateway, notifier)
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Shared audit handle, for readers that outlive the manager.
    pub fn audit_handle(&self) -> Arc<AuditLog> {
        self.audit.clone()
    }

    /// Reload instrument filters now instead of waiting for them to age out.
    pub async fn refresh_precision(&self) -> OmsResult<()> {
        Ok(self.precision.refresh().await?)
    }

    fn record_outcome(&self, outcome: &OrderOutcome) {
        match outcome {
            OrderOutcome::Success(confirmation) => self.audit.record(AuditEvent::OrderPlaced {
                confirmation: confirmation.clone(),
            }),
            OrderOutcome::Failure { request, error } => self.audit.record(
                AuditEvent::order_failed(request.symbol(), request, error),
            ),
        }
    }
}

impl OrderManagement for OrderManager {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, OmsResult<OrderOutcome>> {
        Box::pin(async move {
            match self.router.place_order(&request).await {
                Ok(outcome) => {
                    self.record_outcome(&outcome);
                    Ok(outcome)
                }
                Err(e) => {
                    self.audit.record(AuditEvent::order_failed(
                        request.symbol(),
                        &request,
                        &OrderFailure::validation(e.to_string()),
                    ));
                    Err(e.into())
                }
            }
        })
    }

    fn place_batch(&self, table: OrderTable) -> BoxFuture<'_, BatchResult> {
        Box::pin(async move {
            let result = self.router.place_table(&table).await;
            for outcome in &result.outcomes {
                self.record_outcome(outcome);
            }
            result
        })
    }

    fn change_leverage(
        &self,
        symbol: String,
        leverage: i64,
    ) -> BoxFuture<'_, OmsResult<LeverageAck>> {
        Box::pin(async move {
            match self.router.change_leverage(&symbol, leverage).await {
                Ok(ack) => {
                    self.audit.record(AuditEvent::LeverageChanged {
                        symbol: ack.symbol.clone(),
                        leverage: ack.leverage,
                    });
                    Ok(ack)
                }
                Err(e) => {
                    self.audit.record(AuditEvent::LeverageFailed {
                        symbol: symbol.trim().to_ascii_uppercase(),
                        leverage,
                        error: e.to_string(),
                    });
                    Err(e.into())
                }
            }
        })
    }

    fn cancel_order(
        &self,
        symbol: String,
        order_id: u64,
    ) -> BoxFuture<'_, OmsResult<OrderConfirmation>> {
        Box::pin(async move {
            match self.router.cancel_order(&symbol, order_id).await {
                Ok(confirmation) => {
                    self.audit.record(AuditEvent::OrderCanceled {
                        symbol: confirmation.symbol.clone(),
                        order_id,
                    });
                    Ok(confirmation)
                }
                Err(e) => {
                    self.audit.record(AuditEvent::CancelFailed {
                        symbol: symbol.trim().to_ascii_uppercase(),
                        order_id: Some(order_id),
                        error: e.to_string(),
                    });
                    Err(e.into())
                }
            }
        })
    }

    fn cancel_all_orders(&self, symbol: String) -> BoxFuture<'_, OmsResult<CancelAck>> {
        Box::pin(async move {
            match self.router.cancel_all_orders(&symbol).await {
                Ok(ack) => {
                    self.audit.record(AuditEvent::AllOrdersCanceled {
                        symbol: ack.symbol.clone(),
                    });
                    Ok(ack)
                }
                Err(e) => {
                    self.audit.record(AuditEvent::CancelFailed {
                        symbol: symbol.trim().to_ascii_uppercase(),
                        order_id: None,
                        error: e.to_string(),
                    });
                    Err(e.into())
                }
            }
        })
    }

    fn close_positions(
        &self,
        symbol: Option<String>,
        policy: CloseSizingPolicy,
    ) -> BoxFuture<'_, OmsResult<CloseReport>> {
        Box::pin(async move {
            let report = self
                .closer
                .close_positions(symbol.as_deref(), policy)
                .await?;
            for outcome in &report.outcomes {
                self.audit.record(AuditEvent::from_close(outcome));
            }
            Ok(report)
        })
    }

    fn get_positions(&self) -> BoxFuture<'_, OmsResult<Vec<AssetBalance>>> {
        Box::pin(async move { Ok(self.queries.get_positions().await?) })
    }

    fn get_account_summary(&self) -> BoxFuture<'_, OmsResult<AccountSnapshot>> {
        Box::pin(async move { Ok(self.queries.get_account_summary().await?) })
    }

    fn get_available_balance(
        &self,
        asset: String,
    ) -> BoxFuture<'_, OmsResult<Option<AssetBalance>>> {
        Box::pin(async move { Ok(self.queries.get_available_balance(&asset).await?) })
    }

    fn view_open_futures_positions(&self) -> BoxFuture<'_, OmsResult<Vec<PositionView>>> {
        Box::pin(async move { Ok(self.queries.view_open_futures_positions().await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmsError;
    use oms_core::{FailureKind, OrderSide, ValidationError};
    use oms_gateway::MockGateway;
    use oms_notify::RecordingNotifier;
    use rust_decimal_macros::dec;

    fn manager() -> (Arc<MockGateway>, Arc<RecordingNotifier>, OrderManager) {
        let mock = Arc::new(MockGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = OrderManager::new(
            OmsConfig::with_credentials("key", "secret"),
            mock.clone(),
            notifier.clone(),
        )
        .unwrap();
        (mock, notifier, manager)
    }

    #[test]
    fn test_new_requires_credentials() {
        let mock = Arc::new(MockGateway::new());
        let result = OrderManager::new(
            OmsConfig::default(),
            mock,
            Arc::new(RecordingNotifier::new()),
        );
        assert!(matches!(
            result,
            Err(OmsError::Validation(ValidationError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_order_recorded_in_audit() {
        let (_, _, manager) = manager();
        let outcome = manager
            .place_order(OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.001)))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(manager.audit().placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_local_refusal_recorded_as_validation_failure() {
        let (mock, _, manager) = manager();
        let result = manager
            .place_order(OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0)))
            .await;
        assert!(matches!(result, Err(OmsError::Validation(_))));
        assert!(mock.calls().is_empty());

        let failures = manager.audit().failures();
        assert_eq!(failures.len(), 1);
        match &failures[0].event {
            AuditEvent::OrderFailed { kind, .. } => {
                assert_eq!(kind, FailureKind::Validation.as_str())
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_and_leverage_audited() {
        let (_, _, manager) = manager();
        manager.cancel_order("btcusdt".into(), 42).await.unwrap();
        manager.cancel_all_orders("BTCUSDT".into()).await.unwrap();
        assert!(manager.change_leverage("BTCUSDT".into(), 0).await.is_err());

        let entries = manager.audit().entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            entries[0].event,
            AuditEvent::OrderCanceled { order_id: 42, .. }
        ));
        assert!(matches!(entries[2].event, AuditEvent::LeverageFailed { .. }));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let (mock, _, manager) = manager();
        mock.set_balance("USDT", dec!(100), dec!(0));
        let oms: DynOrderManagement = Arc::new(manager);
        let holdings = oms.get_positions().await.unwrap();
        assert_eq!(holdings[0].asset, "USDT");
    }
}
