//! Mock token verifier for testing.
//!
//! # Example
//!
//! ```ignore
//! let verifier = MockTokenVerifier::new()
//!     .with_user("token-alice", UserId::new("u_alice").unwrap());
//!
//! let user_id = verifier.verify("token-alice").await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};
use crate::ports::TokenVerifier;

/// Maps fixed tokens to user ids. Unknown tokens return `InvalidToken`.
#[derive(Debug, Default, Clone)]
pub struct MockTokenVerifier {
    tokens: HashMap<String, UserId>,
    /// Returned for every verification when set.
    force_error: Option<AuthError>,
}

impl MockTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as belonging to `user_id`.
    pub fn with_user(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    /// Forces all verifications to return the specified error.
    pub fn with_error(mut self, error: AuthError) -> Self {
        self.force_error = Some(error);
        self
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if let Some(error) = &self.force_error {
            return Err(error.clone());
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
