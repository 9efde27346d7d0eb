//! # AppError
//!
//! Failure taxonomy of the content engine. Ports report `anyhow` errors;
//! the engine turns those into `StorageError` before they reach a caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Target absent, or present but owned by someone else. The two are
    /// deliberately indistinguishable.
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed input (unknown field type, content failing strict validation).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing or rejected bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Wiring fault in the host process (e.g. no auth provider registered).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn life_block_not_found(id: impl ToString) -> Self {
        AppError::NotFound("life block".to_string(), id.to_string())
    }

    pub fn content_not_found(id: impl ToString) -> Self {
        AppError::NotFound("content".to_string(), id.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
