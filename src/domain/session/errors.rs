//! Session-specific error types.

use thiserror::Error;

use crate::domain::chat::ChatError;
use crate::domain::foundation::ErrorCode;

/// What a session does with a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Send an error envelope and keep reading.
    Report,
    /// Send an error envelope, then close.
    ReportAndClose,
    /// Close without replying.
    Close,
}

/// Errors raised while a session processes a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A command that needs a user arrived before authentication.
    #[error("authentication required")]
    AuthenticationRequired,
    /// A second `auth` arrived on an authenticated session.
    #[error("already authenticated")]
    AlreadyAuthenticated,
    /// The envelope `type` is not part of the protocol.
    #[error("message type is unknown")]
    UnknownMessageType(String),
    /// The client never authenticated within the allowed window.
    #[error("authentication timed out")]
    AuthenticationTimeout,
    /// A chat command failed validation, resolution or persistence.
    #[error(transparent)]
    Chat(#[from] ChatError),
    /// The frame itself could not be read or decoded.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn unknown_type(kind: impl Into<String>) -> Self {
        SessionError::UnknownMessageType(kind.into())
    }
    pub fn transport(message: impl Into<String>) -> Self {
        SessionError::Transport(message.into())
    }
    pub fn disposition(&self) -> Disposition {
        match self {
            SessionError::AlreadyAuthenticated | SessionError::Chat(_) => Disposition::Report,
            SessionError::UnknownMessageType(_) | SessionError::AuthenticationTimeout => {
                Disposition::ReportAndClose
            }
            SessionError::AuthenticationRequired | SessionError::Transport(_) => {
                Disposition::Close
            }
        }
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::AuthenticationRequired => ErrorCode::AuthenticationRequired,
            SessionError::AlreadyAuthenticated => ErrorCode::AlreadyAuthenticated,
            SessionError::UnknownMessageType(_) => ErrorCode::UnknownMessageType,
            SessionError::AuthenticationTimeout => ErrorCode::AuthenticationTimeout,
            SessionError::Chat(err) => err.code(),
            SessionError::Transport(_) => ErrorCode::InternalError,
        }
    }
    /// Text sent to the client in an error envelope.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
