//! Directory configuration

use serde::Deserialize;

/// Directory configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Optional JSON file with `users` and `groups` to preload
    pub seed_path: Option<String>,
}
