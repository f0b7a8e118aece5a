//! Token signing configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Shortest signing secret accepted in production.
pub const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

/// Longest token lifetime accepted (one year).
pub const MAX_TOKEN_EXPIRY_HOURS: i64 = 24 * 365;

/// Token signing configuration (HS256)
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret
    pub jwt_secret: Secret<String>,

    /// Expected `iss` claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected `aud` claim
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Token lifetime in hours
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production additionally requires a secret of at least
    /// [`MIN_PRODUCTION_SECRET_BYTES`].
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret.len() < MIN_PRODUCTION_SECRET_BYTES {
            return Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_BYTES));
        }
        if self.issuer.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__ISSUER"));
        }
        if self.audience.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__AUDIENCE"));
        }
        if self.token_expiry_hours <= 0 || self.token_expiry_hours > MAX_TOKEN_EXPIRY_HOURS {
            return Err(ValidationError::InvalidTokenExpiry(MAX_TOKEN_EXPIRY_HOURS));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Secret::new(String::new()),
            issuer: default_issuer(),
            audience: default_audience(),
            token_expiry_hours: default_token_expiry_hours(),
        }
    }
}

fn default_issuer() -> String {
    "chat-relay".to_string()
}

fn default_audience() -> String {
    "chat-relay".to_string()
}

fn default_token_expiry_hours() -> i64 {
    24 * 7
}
