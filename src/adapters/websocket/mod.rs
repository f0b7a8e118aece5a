//! WebSocket adapters for the chat relay.
//!
//! # Architecture
//!
//! ```text
//!   socket ──▶ filter_map ──▶ Session::serve ──▶ handlers ──▶ ports
//!                                  │    ▲
//!                   admit / retire │    │ outbound frames
//!                         publish  ▼    │
//!                              ┌──────────┐
//!                              │ Registry │ ──▶ other sessions' outbound
//!                              └──────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Envelope protocol types
//! - [`transport`] - Transport-neutral frames
//! - [`session`] - Per-connection state machine
//! - [`registry`] - Live-session set and fan-out coordinator
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod messages;
pub mod registry;
pub mod session;
pub mod transport;

pub use handler::{relay_router, ws_handler, RelayState, PING_PATH};
pub use messages::{Envelope, ErrorPayload, SendChatRequest, ServerMessage};
pub use registry::{
    LiveSession, Registry, RegistryConfig, RegistryError, RegistryHandle, SessionHandle,
};
pub use session::{Session, SessionServices, SessionSettings};
pub use transport::{Frame, TransportError};
