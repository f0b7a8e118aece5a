//! In-memory directory.
//!
//! Backs the binary when no external directory is configured, and the
//! tests. Can be populated from a JSON seed file:
//!
//! ```json
//! { "users": [{ "id": "u_1", "username": "alice", "name": "Alice" }],
//!   "groups": [{ "id": "g_1", "name": "Team", "member_ids": ["u_1"], "created_by": "u_1" }] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::directory::{Group, User};
use crate::domain::foundation::{DomainError, GroupId, UserId};
use crate::ports::Directory;

/// Contents of a directory seed file.
#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// Failure to load a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory held entirely in memory.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, User>>,
    groups: RwLock<HashMap<GroupId, Group>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        seed.groups.into_iter().fold(
            seed.users.into_iter().fold(Self::new(), Self::with_user),
            Self::with_group,
        )
    }

    /// Loads users and groups from a JSON file.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: DirectorySeed = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_seed(seed))
    }

    // === Builders ===

    pub fn with_user(mut self, user: User) -> Self {
        self.users.get_mut().insert(user.id.clone(), user);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.get_mut().insert(group.id.clone(), group);
        self
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        Ok(self.groups.read().await.get(id).cloned())
    }

    async fn groups_for_member(&self, user_id: &UserId) -> Result<Vec<Group>, DomainError> {
        let mut groups: Vec<Group> = self
            .groups
            .read()
            .await
            .values()
            .filter(|group| group.has_member(user_id))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn gid(s: &str) -> GroupId {
        GroupId::new(s).unwrap()
    }

    fn seeded() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_user(User::new(uid("u_1"), "alice", "Alice"))
            .with_user(User::new(uid("u_2"), "bob", "Bob"))
            .with_group(Group::new(gid("g_1"), "Team", uid("u_1")).with_members([uid("u_2")]))
            .with_group(Group::new(gid("g_2"), "Solo", uid("u_1")))
    }

    #[tokio::test]
    async fn find_user_returns_known_user() {
        let directory = seeded();

        let user = directory.find_user(&uid("u_2")).await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("bob".to_string()));
        assert!(directory.find_user(&uid("u_9")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_group_carries_members() {
        let directory = seeded();

        let group = directory.find_group(&gid("g_1")).await.unwrap().unwrap();
        assert!(group.has_member(&uid("u_2")));
    }

    #[tokio::test]
    async fn groups_for_member_lists_only_joined_groups() {
        let directory = seeded();

        let ids: Vec<_> = directory
            .groups_for_member(&uid("u_2"))
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![gid("g_1")]);

        let all = directory.groups_for_member(&uid("u_1")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn loads_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "users": [
                    {{"id": "u_1", "username": "alice", "name": "Alice"}},
                    {{"id": "u_2", "username": "bob", "name": "Bob"}}
                ],
                "groups": [
                    {{"id": "g_1", "name": "Team", "member_ids": ["u_1", "u_2"], "created_by": "u_1"}}
                ]
            }}"#
        )
        .unwrap();

        let directory = InMemoryDirectory::from_seed_file(file.path()).unwrap();

        assert_eq!(directory.user_count().await, 2);
        assert_eq!(directory.group_count().await, 1);
        assert_eq!(directory.groups_for_member(&uid("u_2")).await.unwrap().len(), 1);
    }

    #[test]
    fn missing_seed_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = InMemoryDirectory::from_seed_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(SeedError::Io { .. })));
    }

    #[test]
    fn malformed_seed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = InMemoryDirectory::from_seed_file(file.path());
        assert!(matches!(result, Err(SeedError::Parse { .. })));
    }
}
