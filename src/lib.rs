//! Chat Relay - real-time chat over authenticated WebSocket sessions
//!
//! Clients open a socket, authenticate with a bearer token, then send direct
//! or group chats that the relay persists and fans out to every live session
//! of each recipient.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
