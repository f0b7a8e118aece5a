//! WebSocket message types for the chat relay protocol.
//!
//! Every frame in both directions is a `{ "type": ..., "data": ... }`
//! envelope, except the literal `ping` / `pong` liveness frames.

use serde::{Deserialize, Serialize};

use crate::application::SendChatCommand;
use crate::domain::chat::{ChatContent, ChatDelivery, ChatRoom, Poll};
use crate::domain::directory::User;
use crate::domain::foundation::UserId;
use crate::domain::session::SessionError;

use super::transport::Frame;

/// Literal liveness request, sent outside the envelope protocol.
pub const PING: &str = "ping";
/// Literal liveness reply.
pub const PONG: &str = "pong";

/// Envelope `type` values a client may send.
pub mod inbound {
    pub const AUTH: &str = "auth";
    pub const SEND_CHAT: &str = "send_chat";
    pub const GET_CHATS: &str = "get_chats";
}

// ============================================
// Client → Server Messages
// ============================================

/// The wire unit for every inbound command.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of an `auth` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    pub token: String,
}

/// Poll as submitted by a client: options are plain strings.
#[derive(Debug, Clone, Deserialize)]
pub struct PollRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Payload of a `send_chat` frame, tagged by chat sub-type.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SendChatRequest {
    Text {
        #[serde(default)]
        chat_id: String,
        #[serde(default)]
        text: String,
    },
    Poll {
        #[serde(default)]
        chat_id: String,
        poll: PollRequest,
    },
}

impl SendChatRequest {
    pub fn into_command(self, sender_id: UserId) -> SendChatCommand {
        let (chat_id, content) = match self {
            SendChatRequest::Text { chat_id, text } => (chat_id, ChatContent::Text { text }),
            SendChatRequest::Poll { chat_id, poll } => (
                chat_id,
                ChatContent::Poll {
                    poll: Poll::new(poll.question, poll.options),
                },
            ),
        };
        SendChatCommand {
            sender_id,
            chat_id,
            content,
        }
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication confirmed.
    Success(AuthSuccess),

    /// A command failed.
    Error(ErrorPayload),

    /// Echo of a stored chat to its sender.
    ChatSent(ChatDelivery),

    /// A chat addressed to this connection's user.
    NewChat(ChatDelivery),

    /// Room listing.
    Chats(Vec<ChatRoom>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSuccess {
    pub message: String,
    pub user: User,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ServerMessage {
    pub fn authenticated(user: User) -> Self {
        ServerMessage::Success(AuthSuccess {
            message: "authenticated".to_string(),
            user,
        })
    }

    pub fn error(err: &SessionError) -> Self {
        ServerMessage::Error(ErrorPayload {
            code: err.code().to_string(),
            message: err.message(),
        })
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::Text)
    }
}
