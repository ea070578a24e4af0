//! Registry error types.

use oms_core::ValidationError;
use oms_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Unknown symbol or unusable filters.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Exchange info could not be fetched.
    #[error("Exchange info lookup failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
