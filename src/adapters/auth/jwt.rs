//! HS256 token service.
//!
//! Issues and verifies the signed tokens clients present in `auth` frames.
//! The signing secret is handed in at construction; nothing is read from
//! process-wide state.
//!
//! # Claims
//!
//! - **sub**: user id
//! - **iss** / **aud**: must match the configured values
//! - **iat** / **nbf**: issuance time
//! - **exp**: issuance time plus the configured expiry
//! - **jti**: `relay-token_<uuid>`

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{AuthError, Timestamp, UserId};
use crate::ports::TokenVerifier;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    aud: String,
    exp: i64,
    nbf: i64,
    iat: i64,
    jti: String,
}

/// Issues and verifies HS256 tokens for a single issuer and audience.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiry_hours: i64,
}

impl JwtTokenService {
    pub fn new(
        secret: &Secret<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry_hours: i64,
    ) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            issuer: issuer.into(),
            audience: audience.into(),
            expiry_hours,
        }
    }

    /// Issues a token for `user_id` valid from now.
    pub fn issue(&self, user_id: &UserId) -> Result<String, AuthError> {
        self.issue_at(user_id, Timestamp::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(&self, user_id: &UserId, issued_at: Timestamp) -> Result<String, AuthError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.as_str().to_string(),
            aud: self.audience.clone(),
            exp: issued_at.plus_hours(self.expiry_hours).as_unix_secs(),
            nbf: issued_at.as_unix_secs(),
            iat: issued_at.as_unix_secs(),
            jti: format!("relay-token_{}", Uuid::new_v4()),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            AuthError::service_unavailable("token signing failed")
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss", "aud"]);
        validation
    }
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry_hours", &self.expiry_hours)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenService {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation()).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "token issued for another service");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "token validation failed");
                    AuthError::InvalidToken
                }
            }
        })?;

        UserId::new(data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Secret<String> {
        Secret::new(s.to_string())
    }

    fn service() -> JwtTokenService {
        JwtTokenService::new(
            &secret("a-test-secret-that-is-long-enough!!"),
            "chat-relay",
            "chat-relay",
            168,
        )
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[tokio::test]
    async fn issued_token_verifies_to_its_subject() {
        let service = service();
        let token = service.issue(&uid("u_alice")).unwrap();

        assert_eq!(service.verify(&token).await.unwrap(), uid("u_alice"));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let service = service();
        let token = service
            .issue_at(&uid("u_alice"), Timestamp::now().plus_hours(-169))
            .unwrap();

        assert_eq!(service.verify(&token).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn not_yet_valid_token_is_rejected() {
        let service = service();
        let token = service
            .issue_at(&uid("u_alice"), Timestamp::now().plus_hours(2))
            .unwrap();

        assert_eq!(service.verify(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let other = JwtTokenService::new(
            &secret("a-completely-different-secret-value"),
            "chat-relay",
            "chat-relay",
            168,
        );
        let token = other.issue(&uid("u_alice")).unwrap();

        assert_eq!(service().verify(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_for_another_audience_is_rejected() {
        let other = JwtTokenService::new(
            &secret("a-test-secret-that-is-long-enough!!"),
            "chat-relay",
            "someone-else",
            168,
        );
        let token = other.issue(&uid("u_alice")).unwrap();

        assert_eq!(service().verify(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        assert_eq!(
            service().verify("not.a.token").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn debug_output_hides_keys() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("long-enough"));
    }
}
