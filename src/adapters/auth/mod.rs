//! Authentication adapters.
//!
//! Implementations of the `TokenVerifier` port:
//!
//! - `jwt` - HS256 token issuer and verifier used by the binary
//! - `mock` - Fixed token table for tests

mod jwt;
mod mock;

pub use jwt::JwtTokenService;
pub use mock::MockTokenVerifier;
