//! Chat store port.
//!
//! Persists chat messages and aggregates them into per-user room listings.

use async_trait::async_trait;

use crate::domain::chat::{ChatMessage, ChatRoom};
use crate::domain::foundation::{DomainError, GroupId, UserId};

/// Persistence for chat history.
///
/// Implementations must ensure:
/// - A message without an id is assigned one on save
/// - A message with an id replaces the stored copy in place
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Save a message and return it as stored.
    ///
    /// # Errors
    ///
    /// - `ChatNotFound` if the message carries an id the store has never seen
    /// - `DatabaseError` on persistence failure
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage, DomainError>;

    /// Rooms for the user's direct chats and the group chats they sent into.
    ///
    /// Returned newest activity first.
    async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<ChatRoom>, DomainError>;

    /// Rooms for the given groups as seen by `user_id`.
    async fn rooms_for_groups(
        &self,
        user_id: &UserId,
        group_ids: &[GroupId],
    ) -> Result<Vec<ChatRoom>, DomainError>;
}
