//! Directory port (read side).
//!
//! The relay never writes users or groups. It resolves chat targets and
//! group membership through this interface.

use async_trait::async_trait;

use crate::domain::directory::{Group, User};
use crate::domain::foundation::{DomainError, GroupId, UserId};

/// Lookup service for users and groups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Find a user by id. Returns `None` if no such user exists.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Find a group by id, including its member list.
    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, DomainError>;

    /// All groups `user_id` belongs to.
    async fn groups_for_member(&self, user_id: &UserId) -> Result<Vec<Group>, DomainError>;
}
