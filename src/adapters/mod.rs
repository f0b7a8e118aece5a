//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to external systems:
//! - `auth` - Token verification (HS256 service, test mock)
//! - `directory` - User and group lookup (in-memory)
//! - `chat_store` - Chat persistence (in-memory)
//! - `websocket` - Sessions, registry and the axum upgrade handler

pub mod auth;
pub mod chat_store;
pub mod directory;
pub mod websocket;

pub use auth::{JwtTokenService, MockTokenVerifier};
pub use chat_store::InMemoryChatStore;
pub use directory::InMemoryDirectory;
