//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod auth;
pub mod chat;

pub use auth::{AuthenticateCommand, AuthenticateHandler};
pub use chat::{GetChatsHandler, GetChatsQuery, SendChatCommand, SendChatHandler};
