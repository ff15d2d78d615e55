use thiserror::Error;

use crate::auth::AuthError;
use crate::database::StoreError;

/// Domain errors raised by the organization/notes services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Plan limit reached. `prompt` is the upgrade call to action.
    #[error("{message}")]
    QuotaExceeded { message: String, prompt: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn tenant_not_found() -> Self {
        ServiceError::NotFound("Tenant not found".to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
