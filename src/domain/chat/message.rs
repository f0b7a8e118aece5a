//! Chat message aggregate.
//!
//! A chat targets either a user or a group through the same `chat_id`
//! field; `is_group` records which one the directory resolved it to.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, UserId};

use super::ChatError;

/// Minimum number of options a poll must offer.
pub const MIN_POLL_OPTIONS: usize = 2;

/// The three kinds of chat payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    Poll,
    Info,
}

/// One option of a poll and the users who voted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    #[serde(default)]
    pub user_votes: Vec<UserId>,
}

/// A poll posted into a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub question: String,
    pub options: Vec<PollOption>,
}

impl Poll {
    /// Creates a poll whose options have no votes yet.
    pub fn new(question: impl Into<String>, options: impl IntoIterator<Item = String>) -> Self {
        Self {
            question: question.into(),
            options: options
                .into_iter()
                .map(|text| PollOption {
                    text,
                    user_votes: Vec::new(),
                })
                .collect(),
        }
    }
}

/// Server-generated notice inside a group, e.g. a member joined or left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    #[serde(rename = "type")]
    pub kind: String,
    /// The user who performed the action.
    pub user_id: UserId,
    pub message: String,
    pub timestamp: Timestamp,
}

/// Payload of a chat message, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatContent {
    Text { text: String },
    Poll { poll: Poll },
    Info { info: ChatInfo },
}

impl ChatContent {
    pub fn text(text: impl Into<String>) -> Self {
        ChatContent::Text { text: text.into() }
    }

    pub fn kind(&self) -> ChatKind {
        match self {
            ChatContent::Text { .. } => ChatKind::Text,
            ChatContent::Poll { .. } => ChatKind::Poll,
            ChatContent::Info { .. } => ChatKind::Info,
        }
    }

    /// Checks the payload carries what its kind requires.
    pub fn validate(&self) -> Result<(), ChatError> {
        match self {
            ChatContent::Text { text } if text.is_empty() => {
                Err(ChatError::invalid_schema("text cannot be empty"))
            }
            ChatContent::Poll { poll } => {
                if poll.question.is_empty() {
                    return Err(ChatError::invalid_schema("poll question cannot be empty"));
                }
                if poll.options.len() < MIN_POLL_OPTIONS {
                    return Err(ChatError::invalid_schema(format!(
                        "poll needs at least {} options",
                        MIN_POLL_OPTIONS
                    )));
                }
                if poll.options.iter().any(|o| o.text.is_empty()) {
                    return Err(ChatError::invalid_schema("poll options cannot be empty"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// A chat message, before or after persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Assigned by the chat store on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub sender_id: UserId,
    /// User id for a direct chat, group id for a group chat.
    pub chat_id: String,
    pub is_group: bool,
    #[serde(flatten)]
    pub content: ChatContent,
    #[serde(default)]
    pub read_by: Vec<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChatMessage {
    /// Creates an unsaved direct message; see [`ChatMessage::into_group`].
    pub fn new(sender_id: UserId, chat_id: impl Into<String>, content: ChatContent) -> Self {
        let now = Timestamp::now();
        Self {
            id: None,
            sender_id,
            chat_id: chat_id.into(),
            is_group: false,
            content,
            read_by: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the message as addressed to a group.
    pub fn into_group(mut self) -> Self {
        self.is_group = true;
        self
    }

    pub fn kind(&self) -> ChatKind {
        self.content.kind()
    }

    /// The room this message belongs to from `viewer`'s point of view.
    ///
    /// Group messages live in the group's room. A direct message lives in
    /// the room named after the other party, and is not visible at all to
    /// users who are neither sender nor target.
    pub fn room_id_for(&self, viewer: &UserId) -> Option<String> {
        if self.is_group {
            return Some(self.chat_id.clone());
        }
        if &self.sender_id == viewer {
            Some(self.chat_id.clone())
        } else if self.chat_id == viewer.as_str() {
            Some(self.sender_id.as_str().to_string())
        } else {
            None
        }
    }

    /// True when `viewer` still has this message to read.
    pub fn is_unread_by(&self, viewer: &UserId) -> bool {
        &self.sender_id != viewer && !self.read_by.contains(viewer)
    }
}
