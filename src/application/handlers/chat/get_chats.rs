//! GetChatsHandler - lists the caller's chat rooms.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::chat::{sort_newest_first, ChatError, ChatRoom};
use crate::domain::directory::Group;
use crate::domain::foundation::{GroupId, UserId};
use crate::ports::{ChatStore, Directory};

/// Query carried by a `get_chats` frame.
#[derive(Debug, Clone)]
pub struct GetChatsQuery {
    pub user_id: UserId,
}

/// Handler for listing rooms.
pub struct GetChatsHandler {
    directory: Arc<dyn Directory>,
    store: Arc<dyn ChatStore>,
}

impl GetChatsHandler {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn ChatStore>) -> Self {
        Self { directory, store }
    }

    /// Direct rooms plus the rooms of every group the caller belongs to,
    /// one entry per chat id, newest activity first.
    pub async fn handle(&self, query: GetChatsQuery) -> Result<Vec<ChatRoom>, ChatError> {
        let user_id = &query.user_id;

        let mut rooms: HashMap<String, ChatRoom> = self
            .store
            .rooms_for_user(user_id)
            .await?
            .into_iter()
            .map(|room| (room.chat_id.clone(), room))
            .collect();

        let groups: HashMap<String, Group> = self
            .directory
            .groups_for_member(user_id)
            .await?
            .into_iter()
            .map(|group| (group.id.as_str().to_string(), group))
            .collect();

        if !groups.is_empty() {
            let group_ids: Vec<GroupId> = groups.values().map(|g| g.id.clone()).collect();
            // Group rooms see every member's messages, so they replace the
            // sender-only view returned above.
            for room in self.store.rooms_for_groups(user_id, &group_ids).await? {
                rooms.insert(room.chat_id.clone(), room);
            }
        }

        let mut rooms: Vec<ChatRoom> = rooms.into_values().collect();
        for room in rooms.iter_mut() {
            if room.is_group {
                room.group = match groups.get(&room.chat_id) {
                    Some(group) => Some(group.clone()),
                    None => match GroupId::new(room.chat_id.as_str()) {
                        Ok(id) => self.directory.find_group(&id).await?,
                        Err(_) => None,
                    },
                };
            } else if let Ok(other) = UserId::new(room.chat_id.as_str()) {
                room.user = self.directory.find_user(&other).await?;
            }
        }

        sort_newest_first(&mut rooms);
        Ok(rooms)
    }
}
