//! Transport-neutral frames.
//!
//! Sessions read and write [`Frame`]s so they can be driven by a real
//! WebSocket or by in-memory channels in tests.

use axum::extract::ws::Message;
use thiserror::Error;

/// One application-level frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// The peer is going away, or the server is closing the connection.
    Close,
}

impl Frame {
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Converts an incoming WebSocket message.
    ///
    /// Protocol-level ping/pong is answered by the WebSocket layer itself
    /// and yields `None`.
    pub fn from_ws(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Frame::Text(text)),
            Message::Binary(bytes) => Some(Frame::Binary(bytes)),
            Message::Close(_) => Some(Frame::Close),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }

    pub fn into_ws(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
            Frame::Close => Message::Close(None),
        }
    }
}

/// The connection failed while reading a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
