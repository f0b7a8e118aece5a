//! Domain layer containing the relay's types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `directory` - User and group records read from the directory
//! - `chat` - Chat messages, deliveries and room listings
//! - `session` - Connection lifecycle and error dispositions

pub mod chat;
pub mod directory;
pub mod foundation;
pub mod session;
