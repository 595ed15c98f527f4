//! Anthropic-specific error handling.

use scripto_core::Error;

/// Anthropic error classes, derived from HTTP status and error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicErrorCode {
    /// Malformed request or invalid parameters.
    InvalidRequest,
    /// Invalid API key.
    AuthenticationError,
    /// Key lacks access to the resource.
    PermissionError,
    /// Model or endpoint not found.
    NotFound,
    /// Request exceeded size limits.
    RequestTooLarge,
    /// Rate limit exceeded.
    RateLimited,
    /// API temporarily overloaded.
    Overloaded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl AnthropicErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (529, _) | (_, "overloaded_error") => Self::Overloaded,
            (401, _) | (_, "authentication_error") => Self::AuthenticationError,
            (403, _) | (_, "permission_error") => Self::PermissionError,
            (404, _) | (_, "not_found_error") => Self::NotFound,
            (413, _) | (_, "request_too_large") => Self::RequestTooLarge,
            (429, _) | (_, "rate_limit_error") => Self::RateLimited,
            (400, _) | (_, "invalid_request_error") => Self::InvalidRequest,
            (500..=599, _) | (_, "api_error") => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is worth retrying with another model.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Overloaded | Self::ServerError
        )
    }
}

/// Convert an Anthropic error into a ScriptO provider error.
pub fn to_scripto_error(code: AnthropicErrorCode, message: &str) -> Error {
    let label = match code {
        AnthropicErrorCode::InvalidRequest => "Invalid request",
        AnthropicErrorCode::AuthenticationError => "Authentication failed",
        AnthropicErrorCode::PermissionError => "Permission denied",
        AnthropicErrorCode::NotFound => "Model not found",
        AnthropicErrorCode::RequestTooLarge => "Request too large",
        AnthropicErrorCode::RateLimited => "Rate limit exceeded",
        AnthropicErrorCode::Overloaded => "Provider overloaded",
        AnthropicErrorCode::ServerError => "Server error",
        AnthropicErrorCode::Unknown => return Error::Provider(message.to_string()),
    };
    Error::Provider(format!("{}: {}", label, message))
}
