//! Gateway error types.

use std::time::Duration;

use oms_core::{FailureKind, OrderFailure};
use thiserror::Error;

/// Binance futures error code for "notional must be no smaller than ...".
pub const MIN_NOTIONAL_CODE: i64 = -4164;

const MIN_NOTIONAL_MESSAGE: &str = "notional must be no smaller than";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The exchange answered with an error payload.
    #[error("APIError(code={code}): {message}")]
    Api { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: String, after: Duration },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Outcome classification of this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Api { .. } => FailureKind::Rejected,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Transport(_) | Self::InvalidResponse(_) => FailureKind::Transport,
        }
    }

    /// Exchange error code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for the exchange's "order notional below minimum" rejection.
    pub fn is_min_notional(&self) -> bool {
        match self {
            Self::Api { code, message } => {
                *code == MIN_NOTIONAL_CODE || message.contains(MIN_NOTIONAL_MESSAGE)
            }
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert into an outcome-level failure, keeping the raw text.
    pub fn to_failure(&self) -> OrderFailure {
        OrderFailure {
            kind: self.failure_kind(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
