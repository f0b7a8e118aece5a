//! Room aggregation for chat listings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::directory::{Group, User};
use crate::domain::foundation::{Timestamp, UserId};

use super::ChatMessage;

/// One conversation in a user's chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    /// The other user's id for direct rooms, the group id for group rooms.
    pub chat_id: String,
    pub is_group: bool,
    pub last_chat: ChatMessage,
    pub unread_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

impl ChatRoom {
    pub fn last_activity(&self) -> Timestamp {
        self.last_chat.updated_at
    }

    /// Groups `messages` into rooms as seen by `viewer`, newest first.
    ///
    /// Messages the viewer cannot see are skipped.
    pub fn collect<'a>(
        viewer: &UserId,
        messages: impl IntoIterator<Item = &'a ChatMessage>,
    ) -> Vec<ChatRoom> {
        let mut rooms: HashMap<String, ChatRoom> = HashMap::new();

        for message in messages {
            let Some(room_id) = message.room_id_for(viewer) else {
                continue;
            };
            let unread = usize::from(message.is_unread_by(viewer));
            let room = rooms.entry(room_id.clone()).or_insert_with(|| ChatRoom {
                chat_id: room_id,
                is_group: message.is_group,
                last_chat: message.clone(),
                unread_count: 0,
                user: None,
                group: None,
            });
            room.unread_count += unread;
            if message.updated_at >= room.last_chat.updated_at {
                room.last_chat = message.clone();
            }
        }

        let mut rooms: Vec<ChatRoom> = rooms.into_values().collect();
        sort_newest_first(&mut rooms);
        rooms
    }
}

/// Orders rooms by last activity, most recent first; ties break on chat id.
pub fn sort_newest_first(rooms: &mut [ChatRoom]) {
    rooms.sort_by(|a, b| {
        b.last_activity()
            .cmp(&a.last_activity())
            .then_with(|| a.chat_id.cmp(&b.chat_id))
    });
}
