//! SendChatHandler - validates, resolves and persists a chat command.

use std::sync::Arc;

use crate::domain::chat::{ChatContent, ChatDelivery, ChatError, ChatMessage};
use crate::domain::foundation::{GroupId, UserId};
use crate::ports::{ChatStore, Directory};

/// Command carried by a `send_chat` frame.
#[derive(Debug, Clone)]
pub struct SendChatCommand {
    pub sender_id: UserId,
    pub chat_id: String,
    pub content: ChatContent,
}

/// Handler for sending a chat to a user or a group.
pub struct SendChatHandler {
    directory: Arc<dyn Directory>,
    store: Arc<dyn ChatStore>,
}

impl SendChatHandler {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn ChatStore>) -> Self {
        Self { directory, store }
    }

    /// Returns the stored message enriched for fan-out.
    ///
    /// Nothing is persisted unless every check passes, and the delivery is
    /// only produced after the store accepted the message.
    pub async fn handle(&self, cmd: SendChatCommand) -> Result<ChatDelivery, ChatError> {
        // 1. Payload shape
        if matches!(cmd.content, ChatContent::Info { .. }) {
            return Err(ChatError::invalid_schema("info chats are server generated"));
        }
        cmd.content.validate()?;

        // 2. Target sanity, before touching the directory
        if cmd.chat_id.is_empty() {
            return Err(ChatError::EmptyChatId);
        }
        if cmd.chat_id == cmd.sender_id.as_str() {
            return Err(ChatError::SelfChat);
        }

        // 3. Resolve the target: a group wins over a user with the same id
        let group_id = GroupId::new(cmd.chat_id.as_str()).map_err(|_| ChatError::EmptyChatId)?;
        let group = self.directory.find_group(&group_id).await?;

        let message = ChatMessage::new(cmd.sender_id, cmd.chat_id.as_str(), cmd.content);

        let delivery = match group {
            Some(group) => {
                let stored = self.store.save(message.into_group()).await?;
                ChatDelivery::to_group(stored, group)
            }
            None => {
                let receiver_id =
                    UserId::new(cmd.chat_id.as_str()).map_err(|_| ChatError::EmptyChatId)?;
                let receiver = self
                    .directory
                    .find_user(&receiver_id)
                    .await?
                    .ok_or_else(|| ChatError::not_found(cmd.chat_id.as_str()))?;
                let stored = self.store.save(message).await?;
                ChatDelivery::direct(stored, receiver)
            }
        };

        tracing::debug!(
            sender_id = %delivery.sender_id(),
            chat_id = %delivery.chat.chat_id,
            is_group = delivery.chat.is_group,
            "chat stored"
        );

        Ok(delivery)
    }
}
