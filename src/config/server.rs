//! Listener configuration: where the relay binds, how it logs, and the
//! WebSocket endpoint it exposes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::websocket::PING_PATH;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind to
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Comma-separated CORS origins; unset or empty allows any origin
    pub cors_origins: Option<String>,
    /// Route of the WebSocket upgrade
    pub ws_path: String,
    /// Milliseconds a closing connection may spend flushing queued frames
    /// before its socket is dropped
    pub close_grace_ms: u64,
}

/// Deployment environment; production switches logging to JSON and
/// tightens secret checks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ValidationError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ValidationError::InvalidBindAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Configured CORS origins, blanks removed.
    pub fn allowed_origins(&self) -> Vec<&str> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.bind_addr()?;
        if !self.ws_path.starts_with('/') || self.ws_path == PING_PATH {
            return Err(ValidationError::InvalidWsPath(self.ws_path.clone()));
        }
        if self.close_grace_ms == 0 {
            return Err(ValidationError::ZeroSetting("close_grace_ms"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            log_level: "info,chat_relay=debug,tower_http=info".to_string(),
            cors_origins: None,
            ws_path: "/ws/chats".to_string(),
            close_grace_ms: 2000,
        }
    }
}
