//! Prometheus metrics for the order management core.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup-time programming error. These
//! panics happen only during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec,
};

/// Orders submitted.
/// Labels: market (spot/futures), outcome (success/rejected/timeout/transport/validation)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oms_orders_total",
        "Total orders by market and outcome",
        &["market", "outcome"]
    )
    .unwrap()
});

/// Close outcomes.
/// Labels: outcome (closed/failed/unclosable)
pub static CLOSE_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oms_close_outcomes_total",
        "Total position close outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Gateway calls that exceeded their deadline.
pub static GATEWAY_TIMEOUTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oms_gateway_timeouts_total",
        "Total gateway calls that timed out",
        &["operation"]
    )
    .unwrap()
});

/// Notifications that failed or timed out.
pub static NOTIFICATIONS_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "oms_notifications_failed_total",
        "Total notifications that could not be delivered"
    )
    .unwrap()
});

/// Instrument precision table reloads.
pub static PRECISION_REFRESH_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "oms_precision_refresh_total",
        "Total exchange-info reloads of the precision table"
    )
    .unwrap()
});

/// Order round-trip latency.
pub static ORDER_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "oms_order_latency_ms",
        "Order submission round-trip latency in milliseconds",
        &["market"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 10000.0]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record an order outcome.
    pub fn order(market: &str, outcome: &str) {
        ORDERS_TOTAL.with_label_values(&[market, outcome]).inc();
    }

    /// Record order round-trip latency.
    pub fn order_latency(market: &str, latency_ms: f64) {
        ORDER_LATENCY_MS
            .with_label_values(&[market])
            .observe(latency_ms);
    }

    /// Record a close outcome.
    pub fn close_outcome(outcome: &str) {
        CLOSE_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a gateway timeout.
    pub fn gateway_timeout(operation: &str) {
        GATEWAY_TIMEOUTS_TOTAL
            .with_label_values(&[operation])
            .inc();
    }

    /// Record an undelivered notification.
    pub fn notification_failed() {
        NOTIFICATIONS_FAILED_TOTAL.inc();
    }

    /// Record a precision table reload.
    pub fn precision_refresh() {
        PRECISION_REFRESH_TOTAL.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = ORDERS_TOTAL.with_label_values(&["futures", "rejected"]).get();
        Metrics::order("futures", "rejected");
        let after = ORDERS_TOTAL.with_label_values(&["futures", "rejected"]).get();
        assert!(after >= before + 1.0);

        let before = CLOSE_OUTCOMES_TOTAL.with_label_values(&["unclosable"]).get();
        Metrics::close_outcome("unclosable");
        assert!(CLOSE_OUTCOMES_TOTAL.with_label_values(&["unclosable"]).get() >= before + 1.0);
    }
}
