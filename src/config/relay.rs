//! Relay tuning: buffers, hand-off timeouts and fan-out policy

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Frames buffered per connection
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Capacity of each registry queue
    #[serde(default = "default_registry_queue_capacity")]
    pub registry_queue_capacity: usize,

    /// Session → registry hand-off timeout in milliseconds
    #[serde(default = "default_handoff_timeout_ms")]
    pub handoff_timeout_ms: u64,

    /// Seconds an unauthenticated connection is kept open
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,

    /// Deliver group chats to the sender's own sessions too
    #[serde(default = "default_include_sender")]
    pub include_sender_in_group_fanout: bool,

    /// Consecutive dropped events before a slow session is evicted
    #[serde(default = "default_max_consecutive_drops")]
    pub max_consecutive_drops: u32,
}

impl RelayConfig {
    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_millis(self.handoff_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks = [
            ("outbound_buffer", self.outbound_buffer as u64),
            ("registry_queue_capacity", self.registry_queue_capacity as u64),
            ("handoff_timeout_ms", self.handoff_timeout_ms),
            ("auth_timeout_secs", self.auth_timeout_secs),
            ("max_consecutive_drops", u64::from(self.max_consecutive_drops)),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ValidationError::ZeroSetting(*name)),
            None => Ok(()),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            registry_queue_capacity: default_registry_queue_capacity(),
            handoff_timeout_ms: default_handoff_timeout_ms(),
            auth_timeout_secs: default_auth_timeout_secs(),
            include_sender_in_group_fanout: default_include_sender(),
            max_consecutive_drops: default_max_consecutive_drops(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_registry_queue_capacity() -> usize {
    256
}

fn default_handoff_timeout_ms() -> u64 {
    1000
}

fn default_auth_timeout_secs() -> u64 {
    30
}

fn default_include_sender() -> bool {
    true
}

fn default_max_consecutive_drops() -> u32 {
    8
}
