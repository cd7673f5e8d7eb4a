use std::sync::Arc;

use reqwest::StatusCode;
use shelfmark_api_types::BookId;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Failure of a single catalog operation.
///
/// `Clone` so a deduplicated read can hand the same failure to every caller
/// that joined it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(Arc<reqwest::Error>),
    #[error("server responded with status {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("server rejected the request: {message}")]
    Rejected { message: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("book `{id}` not found")]
    NotFound { id: BookId },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Short text suitable for a transient notification.
    ///
    /// Prefers the message the backend sent; falls back to a fixed phrase
    /// per failure kind.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Could not reach the library service.".to_string(),
            ApiError::Status {
                message: Some(message),
                ..
            }
            | ApiError::Rejected { message }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            ApiError::Status { .. } | ApiError::Rejected { .. } => {
                "Could not process your request.".to_string()
            }
            ApiError::Validation(message) => message.clone(),
            ApiError::NotFound { .. } => {
                "We couldn't find the book you're looking for.".to_string()
            }
            ApiError::Decode(_) => "The library service sent an unexpected response.".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
            || matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(Arc::new(error))
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::Validation(message),
        }
    }
}
