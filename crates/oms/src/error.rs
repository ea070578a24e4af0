//! Facade error types.

use oms_core::ValidationError;
use oms_executor::ExecutorError;
use oms_gateway::GatewayError;
use oms_position::PositionError;
use oms_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecutorError> for OmsError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Validation(e) => Self::Validation(e),
            ExecutorError::Gateway(e) => Self::Gateway(e),
        }
    }
}

impl From<RegistryError> for OmsError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(e) => Self::Validation(e),
            RegistryError::Gateway(e) => Self::Gateway(e),
        }
    }
}

impl From<PositionError> for OmsError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::Validation(e) => Self::Validation(e),
            PositionError::Gateway(e) => Self::Gateway(e),
        }
    }
}

pub type OmsResult<T> = Result<T, OmsError>;
