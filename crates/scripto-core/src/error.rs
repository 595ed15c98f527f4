//! Error types for the ScriptO AI pipeline.

use thiserror::Error;

/// Result type alias using ScriptO's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ScriptO operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Interaction not found, or not owned by the caller
    #[error("Interaction not found: {0}")]
    InteractionNotFound(uuid::Uuid),

    /// Upstream AI provider call failed
    #[error("AI provider error: {0}")]
    Provider(String),

    /// Upstream AI provider call exceeded its deadline
    #[error("AI provider timeout: {0}")]
    Timeout(String),

    /// Preprocessing rejected the input
    #[error("Processing error: {0}")]
    Processing(String),

    /// Lifecycle transition not allowed from the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Work could not be accepted right now (queue at capacity, worker stopped)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl Error {
    /// True for failures originating in the upstream AI call.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::Timeout(_))
    }

    /// True for failures caused by the caller's input.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Error::Processing(_) | Error::InvalidInput(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
