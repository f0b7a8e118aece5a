//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_RELAY` prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.bind_addr());
//! ```

mod auth;
mod directory;
mod error;
mod relay;
mod server;

pub use auth::{AuthConfig, MAX_TOKEN_EXPIRY_HOURS, MIN_PRODUCTION_SECRET_BYTES};
pub use directory::DirectoryConfig;
pub use error::{ConfigError, ValidationError};
pub use relay::RelayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Token signing configuration
    pub auth: AuthConfig,

    /// Session and registry tuning
    #[serde(default)]
    pub relay: RelayConfig,

    /// In-memory directory seeding
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__AUTH__JWT_SECRET=...` -> `auth.jwt_secret = ...`
    /// - `CHAT_RELAY__RELAY__AUTH_TIMEOUT_SECS=30` -> `relay.auth_timeout_secs = 30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.relay.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CHAT_RELAY__AUTH__JWT_SECRET", "test-secret-for-config-loading");
    }

    fn clear_env() {
        env::remove_var("CHAT_RELAY__AUTH__JWT_SECRET");
        env::remove_var("CHAT_RELAY__SERVER__PORT");
        env::remove_var("CHAT_RELAY__SERVER__ENVIRONMENT");
        env::remove_var("CHAT_RELAY__RELAY__INCLUDE_SENDER_IN_GROUP_FANOUT");
        env::remove_var("CHAT_RELAY__RELAY__AUTH_TIMEOUT_SECS");
        env::remove_var("CHAT_RELAY__DIRECTORY__SEED_PATH");
        env::remove_var("CHAT_RELAY__SERVER__WS_PATH");
        env::remove_var("CHAT_RELAY__SERVER__CLOSE_GRACE_MS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(
            config.auth.jwt_secret.expose_secret(),
            "test-secret-for-config-loading"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.auth.token_expiry_hours, 168);
        assert_eq!(config.relay.auth_timeout_secs, 30);
        assert!(config.relay.include_sender_in_group_fanout);
        assert!(config.directory.seed_path.is_none());
    }

    #[test]
    fn test_relay_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__RELAY__INCLUDE_SENDER_IN_GROUP_FANOUT", "false");
        env::set_var("CHAT_RELAY__RELAY__AUTH_TIMEOUT_SECS", "5");
        env::set_var("CHAT_RELAY__DIRECTORY__SEED_PATH", "/tmp/seed.json");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(!config.relay.include_sender_in_group_fanout);
        assert_eq!(config.relay.auth_timeout_secs, 5);
        assert_eq!(config.directory.seed_path.as_deref(), Some("/tmp/seed.json"));
    }

    #[test]
    fn test_connection_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__WS_PATH", "/chat");
        env::set_var("CHAT_RELAY__SERVER__CLOSE_GRACE_MS", "250");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.ws_path, "/chat");
        assert_eq!(config.server.close_grace(), std::time::Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_BYTES))
        );
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
