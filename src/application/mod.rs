//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands (`auth`, `send_chat`) and queries (`get_chats`) each get one
//! handler.

pub mod handlers;

pub use handlers::{
    AuthenticateCommand, AuthenticateHandler, GetChatsHandler, GetChatsQuery, SendChatCommand,
    SendChatHandler,
};
