//! Position error types.

use oms_core::ValidationError;
use oms_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Account data could not be fetched.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type PositionResult<T> = Result<T, PositionError>;
