//! User record as exposed by the directory.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// A registered user.
///
/// Credentials never leave the directory, so this record carries only the
/// public profile that is safe to send to other clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl User {
    /// Creates a user with the given id, username and display name.
    pub fn new(id: UserId, username: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            username: username.into(),
            name: name.into(),
            location: String::new(),
            image_url: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
