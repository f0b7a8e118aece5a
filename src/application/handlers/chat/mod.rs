//! Chat command and query handlers.

mod get_chats;
mod send_chat;

pub use get_chats::{GetChatsHandler, GetChatsQuery};
pub use send_chat::{SendChatCommand, SendChatHandler};
