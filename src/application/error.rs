use thiserror::Error;

use crate::{
    config::LoadError, domain::error::DomainError, infra::error::InfraError,
    infra::http::ApiError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// One-line notice shown to the person at the terminal.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(error) => error.user_message(),
            AppError::Config(error) => format!("configuration error: {error}"),
            AppError::Infra(InfraError::Io(error)) => format!("I/O failure: {error}"),
            AppError::Infra(error) => error.to_string(),
            AppError::Validation(message) => message.clone(),
            AppError::Unexpected(_) => "Unexpected error occurred".to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::Validation(message),
        }
    }
}
