//! Executor error types.

use oms_core::ValidationError;
use oms_gateway::GatewayError;
use oms_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<RegistryError> for ExecutorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(e) => Self::Validation(e),
            RegistryError::Gateway(e) => Self::Gateway(e),
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
