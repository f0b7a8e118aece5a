//! Token verification port.
//!
//! Turns the opaque token a client presents in an `auth` frame into the id
//! of the user it was issued for. Implementations own every detail of the
//! token format; callers only see [`AuthError`].

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};

/// Verifies access tokens and extracts the subject.
///
/// # Contract
///
/// Implementations must:
/// - Validate the signature and every time-based claim
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::InvalidToken` for anything else that fails to verify
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the user id it carries.
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}
