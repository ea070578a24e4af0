//! Per-call outcome types.
//!
//! Exchange rejections are ordinary values here, not errors. Each operation
//! returns its own outcome set; nothing accumulates across calls.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::order::{OrderConfirmation, OrderRequest};

/// Why an order did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The exchange answered and refused the request.
    Rejected,
    /// No answer within the deadline. The order may or may not exist.
    Timeout,
    /// Connection failure or unreadable response.
    Transport,
    /// Refused locally before reaching the exchange.
    Validation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error detail attached to a failed order or close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFailure {
    pub kind: FailureKind,
    /// Exchange error code, when the exchange supplied one.
    pub code: Option<i64>,
    /// Raw error text.
    pub message: String,
}

impl OrderFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }
}

impl fmt::Display for OrderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of submitting a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrderOutcome {
    Success(OrderConfirmation),
    Failure {
        request: OrderRequest,
        error: OrderFailure,
    },
}

impl OrderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn confirmation(&self) -> Option<&OrderConfirmation> {
        match self {
            Self::Success(conf) => Some(conf),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&OrderFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// A failed batch row, keeping the request for correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOrder {
    /// Position of the row in the submitted batch.
    pub index: usize,
    pub request: OrderRequest,
    pub error: OrderFailure,
}

/// Outcomes of a batch, one per input row, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<OrderOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Split into (successes, failures), each preserving input order.
    pub fn split(self) -> (Vec<OrderConfirmation>, Vec<FailedOrder>) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for (index, outcome) in self.outcomes.into_iter().enumerate() {
            match outcome {
                OrderOutcome::Success(conf) => successes.push(conf),
                OrderOutcome::Failure { request, error } => failures.push(FailedOrder {
                    index,
                    request,
                    error,
                }),
            }
        }
        (successes, failures)
    }
}

/// Result of attempting to close one futures position.
///
/// Three terminal states. `Unclosable` is not a failure: the position is
/// too small to trade out of and needs manual handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseOutcome {
    Closed {
        symbol: String,
        order: OrderConfirmation,
    },
    Failed {
        symbol: String,
        error: OrderFailure,
    },
    Unclosable {
        symbol: String,
        notional_value: Decimal,
    },
}

impl CloseOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Closed { symbol, .. }
            | Self::Failed { symbol, .. }
            | Self::Unclosable { symbol, .. } => symbol,
        }
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Failed { .. } => "failed",
            Self::Unclosable { .. } => "unclosable",
        }
    }
}

/// Outcomes of a close sweep, in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    pub outcomes: Vec<CloseOutcome>,
}

impl CloseReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn closed(&self) -> impl Iterator<Item = (&str, &OrderConfirmation)> {
        self.outcomes.iter().filter_map(|o| match o {
            CloseOutcome::Closed { symbol, order } => Some((symbol.as_str(), order)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &OrderFailure)> {
        self.outcomes.iter().filter_map(|o| match o {
            CloseOutcome::Failed { symbol, error } => Some((symbol.as_str(), error)),
            _ => None,
        })
    }

    pub fn unclosable(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.outcomes.iter().filter_map(|o| match o {
            CloseOutcome::Unclosable {
                symbol,
                notional_value,
            } => Some((symbol.as_str(), *notional_value)),
            _ => None,
        })
    }
}
