//! Append-only audit history.
//!
//! The manager records what it did here. Operation results never read from
//! it, so dropping or capping the log changes nothing but the history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use oms_core::{CloseOutcome, OrderConfirmation, OrderFailure};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Something the manager did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    OrderPlaced {
        confirmation: OrderConfirmation,
    },
    OrderFailed {
        symbol: String,
        request: String,
        error: String,
        kind: String,
    },
    LeverageChanged {
        symbol: String,
        leverage: u32,
    },
    LeverageFailed {
        symbol: String,
        leverage: i64,
        error: String,
    },
    OrderCanceled {
        symbol: String,
        order_id: u64,
    },
    AllOrdersCanceled {
        symbol: String,
    },
    CancelFailed {
        symbol: String,
        order_id: Option<u64>,
        error: String,
    },
    PositionClosed {
        symbol: String,
        confirmation: OrderConfirmation,
    },
    CloseFailed {
        symbol: String,
        error: String,
    },
    PositionUnclosable {
        symbol: String,
        notional_value: Decimal,
    },
}

impl AuditEvent {
    pub fn order_failed(symbol: &str, request: impl ToString, failure: &OrderFailure) -> Self {
        Self::OrderFailed {
            symbol: symbol.to_string(),
            request: request.to_string(),
            error: failure.message.clone(),
            kind: failure.kind.as_str().to_string(),
        }
    }

    pub fn from_close(outcome: &CloseOutcome) -> Self {
        match outcome {
            CloseOutcome::Closed { symbol, order } => Self::PositionClosed {
                symbol: symbol.clone(),
                confirmation: order.clone(),
            },
            CloseOutcome::Failed { symbol, error } => Self::CloseFailed {
                symbol: symbol.clone(),
                error: error.to_string(),
            },
            CloseOutcome::Unclosable {
                symbol,
                notional_value,
            } => Self::PositionUnclosable {
                symbol: symbol.clone(),
                notional_value: *notional_value,
            },
        }
    }
}

/// A timestamped audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Thread-safe append-only audit log.
///
/// With a capacity set, the oldest entries are dropped first.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: Option<usize>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        let entry = AuditEntry {
            at: Utc::now(),
            event,
        };
        let mut entries = self.entries.lock();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(entry);
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Confirmations of every order placed, closes included.
    pub fn placed_orders(&self) -> Vec<OrderConfirmation> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match &e.event {
                AuditEvent::OrderPlaced { confirmation }
                | AuditEvent::PositionClosed { confirmation, .. } => Some(confirmation.clone()),
                _ => None,
            })
            .collect()
    }

    /// Failed order and close events.
    pub fn failures(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| {
                matches!(
                    e.event,
                    AuditEvent::OrderFailed { .. } | AuditEvent::CloseFailed { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// One JSON object per line.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let entries = self.entries.lock();
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::{OrderSide, OrderType, Size};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn confirmation(symbol: &str, order_id: u64) -> OrderConfirmation {
        OrderConfirmation {
            symbol: symbol.to_string(),
            order_id,
            client_order_id: None,
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            status: "FILLED".to_string(),
            orig_qty: Size::new(dec!(1)),
            price: None,
            reduce_only: false,
            update_time: 0,
        }
    }

    #[test]
    fn test_append_order_and_queries() {
        let log = AuditLog::new();
        log.record(AuditEvent::OrderPlaced {
            confirmation: confirmation("BTCUSDT", 1),
        });
        log.record(AuditEvent::CloseFailed {
            symbol: "ETHUSDT".to_string(),
            error: "boom".to_string(),
        });
        log.record(AuditEvent::PositionClosed {
            symbol: "ADAUSDT".to_string(),
            confirmation: confirmation("ADAUSDT", 2),
        });

        assert_eq!(log.len(), 3);
        let placed = log.placed_orders();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[1].order_id, 2);
        assert_eq!(log.failures().len(), 1);

        let entries = log.entries();
        assert!(entries[0].at <= entries[2].at);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = AuditLog::with_capacity(2);
        for id in 1..=3 {
            log.record(AuditEvent::OrderCanceled {
                symbol: "BTCUSDT".to_string(),
                order_id: id,
            });
        }
        let ids: Vec<u64> = log
            .entries()
            .into_iter()
            .filter_map(|e| match e.event {
                AuditEvent::OrderCanceled { order_id, .. } => Some(order_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = AuditLog::with_capacity(0);
        log.record(AuditEvent::AllOrdersCanceled {
            symbol: "BTCUSDT".to_string(),
        });
        assert!(log.is_empty());
    }

    #[test]
    fn test_json_lines() {
        let log = AuditLog::new();
        log.record(AuditEvent::PositionUnclosable {
            symbol: "ETHUSDT".to_string(),
            notional_value: dec!(3),
        });
        let out = log.to_json_lines().unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["event"], "position_unclosable");
        assert_eq!(value["symbol"], "ETHUSDT");
        assert!(value["at"].is_string());
    }

    #[test]
    fn test_concurrent_appends() {
        let log = Arc::new(AuditLog::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record(AuditEvent::OrderCanceled {
                            symbol: format!("T{t}"),
                            order_id: i,
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(log.len(), 200);
    }
}
