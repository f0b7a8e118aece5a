//! Chat-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors produced while validating, resolving or persisting a chat command.
///
/// Every variant is a command-level failure: it is reported to the sender
/// and never ends the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The payload does not match any accepted chat shape.
    #[error("invalid message schema: {0}")]
    InvalidSchema(String),
    /// No target was given.
    #[error("chat id cannot be empty")]
    EmptyChatId,
    /// Sender and target are the same user.
    #[error("cannot send to yourself")]
    SelfChat,
    /// The target is neither a known group nor a known user.
    #[error("chat not found")]
    ChatNotFound(String),
    /// The directory could not be queried.
    #[error("directory unavailable: {0}")]
    Directory(String),
    /// The chat store rejected the operation.
    #[error("failed to store chat: {0}")]
    Persistence(String),
}

impl ChatError {
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        ChatError::InvalidSchema(reason.into())
    }
    pub fn not_found(chat_id: impl Into<String>) -> Self {
        ChatError::ChatNotFound(chat_id.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::InvalidSchema(_) => ErrorCode::InvalidSchema,
            ChatError::EmptyChatId => ErrorCode::ValidationFailed,
            ChatError::SelfChat => ErrorCode::SelfChat,
            ChatError::ChatNotFound(_) => ErrorCode::ChatNotFound,
            ChatError::Directory(_) => ErrorCode::DirectoryError,
            ChatError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ChatNotFound => ChatError::ChatNotFound(err.message),
            ErrorCode::DirectoryError => ChatError::Directory(err.message),
            _ => ChatError::Persistence(err.message),
        }
    }
}
