//! In-memory chat store.
//!
//! Keeps every message in insertion order and aggregates rooms on read.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::chat::{ChatMessage, ChatRoom};
use crate::domain::foundation::{DomainError, ErrorCode, GroupId, MessageId, Timestamp, UserId};
use crate::ports::ChatStore;

#[derive(Default)]
pub struct InMemoryChatStore {
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn find(&self, id: &MessageId) -> Option<ChatMessage> {
        self.messages
            .read()
            .await
            .iter()
            .find(|m| m.id.as_ref() == Some(id))
            .cloned()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn save(&self, mut message: ChatMessage) -> Result<ChatMessage, DomainError> {
        let mut messages = self.messages.write().await;

        match message.id {
            None => {
                message.id = Some(MessageId::new());
                messages.push(message.clone());
            }
            Some(id) => {
                let slot = messages
                    .iter_mut()
                    .find(|m| m.id == Some(id))
                    .ok_or_else(|| {
                        DomainError::new(ErrorCode::ChatNotFound, "chat not found")
                            .with_detail("id", id.to_string())
                    })?;
                message.updated_at = Timestamp::now();
                *slot = message.clone();
            }
        }

        Ok(message)
    }

    async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<ChatRoom>, DomainError> {
        let messages = self.messages.read().await;
        let visible = messages.iter().filter(|m| {
            if m.is_group {
                &m.sender_id == user_id
            } else {
                &m.sender_id == user_id || m.chat_id == user_id.as_str()
            }
        });
        Ok(ChatRoom::collect(user_id, visible))
    }

    async fn rooms_for_groups(
        &self,
        user_id: &UserId,
        group_ids: &[GroupId],
    ) -> Result<Vec<ChatRoom>, DomainError> {
        let messages = self.messages.read().await;
        let visible = messages
            .iter()
            .filter(|m| m.is_group && group_ids.iter().any(|g| g.as_str() == m.chat_id));
        Ok(ChatRoom::collect(user_id, visible))
    }
}
