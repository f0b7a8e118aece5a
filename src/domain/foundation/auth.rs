//! Authentication errors for the domain layer.
//!
//! These errors are **domain-centric** - they describe what went wrong from
//! the relay's perspective, not the token library's. Any `TokenVerifier`
//! implementation maps its failures onto them.

use thiserror::Error;

/// Authentication errors that can occur during token verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the user no longer exists in the directory.
    #[error("User not found")]
    UserNotFound,

    /// The token could not be signed or the directory was unreachable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
