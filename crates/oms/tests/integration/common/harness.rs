//! Shared test harness.
//!
//! Builds an `OrderManager` over a `MockGateway` and a `RecordingNotifier`
//! with three listed futures instruments and the exchange's minimum notional.

use std::sync::Arc;

use oms::{OmsConfig, OrderManager};
use oms_gateway::MockGateway;
use oms_notify::RecordingNotifier;
use rust_decimal_macros::dec;

pub struct Harness {
    pub mock: Arc<MockGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub manager: OrderManager,
}

pub fn config() -> OmsConfig {
    OmsConfig::with_credentials("test-key", "test-secret")
}

pub fn harness() -> Harness {
    harness_with(config(), Arc::new(RecordingNotifier::new()))
}

pub fn harness_with(config: OmsConfig, notifier: Arc<RecordingNotifier>) -> Harness {
    let mock = Arc::new(MockGateway::new());
    mock.add_symbol("BTCUSDT", dec!(0.001), dec!(0.1));
    mock.add_symbol("ETHUSDT", dec!(0.001), dec!(0.01));
    mock.add_symbol("ADAUSDT", dec!(1), dec!(0.0001));
    mock.set_min_notional(dec!(5));

    let manager = OrderManager::new(config, mock.clone(), notifier.clone())
        .expect("test config is valid");
    Harness {
        mock,
        notifier,
        manager,
    }
}
