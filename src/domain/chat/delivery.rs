//! Outbound chat events.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::directory::{Group, User};
use crate::domain::foundation::UserId;

use super::ChatMessage;

/// A persisted chat enriched with whoever it was resolved to.
///
/// This is the unit the registry fans out. Exactly one of `receiver` or
/// `group` is set, matching `chat.is_group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelivery {
    #[serde(flatten)]
    pub chat: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

impl ChatDelivery {
    pub fn direct(chat: ChatMessage, receiver: User) -> Self {
        Self {
            chat,
            receiver: Some(receiver),
            group: None,
        }
    }

    pub fn to_group(chat: ChatMessage, group: Group) -> Self {
        Self {
            chat,
            receiver: None,
            group: Some(group),
        }
    }

    pub fn sender_id(&self) -> &UserId {
        &self.chat.sender_id
    }

    /// Users whose live sessions should receive this event.
    ///
    /// Group events go to every member, with the sender kept only when
    /// `include_sender` is set. Direct events go to the receiver alone.
    pub fn recipients(&self, include_sender: bool) -> BTreeSet<UserId> {
        match (&self.group, &self.receiver) {
            (Some(group), _) => group
                .member_ids
                .iter()
                .filter(|id| include_sender || *id != self.sender_id())
                .cloned()
                .collect(),
            (None, Some(receiver)) => BTreeSet::from([receiver.id.clone()]),
            (None, None) => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ChatContent;
    use crate::domain::foundation::GroupId;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn team() -> Group {
        Group::new(GroupId::new("g_1").unwrap(), "Team", uid("u_1"))
            .with_members([uid("u_2"), uid("u_3")])
    }

    #[test]
    fn group_recipients_include_sender_when_asked() {
        let chat = ChatMessage::new(uid("u_1"), "g_1", ChatContent::text("hi")).into_group();
        let delivery = ChatDelivery::to_group(chat, team());

        assert_eq!(
            delivery.recipients(true),
            BTreeSet::from([uid("u_1"), uid("u_2"), uid("u_3")])
        );
    }

    #[test]
    fn group_recipients_can_exclude_sender() {
        let chat = ChatMessage::new(uid("u_1"), "g_1", ChatContent::text("hi")).into_group();
        let delivery = ChatDelivery::to_group(chat, team());

        assert_eq!(
            delivery.recipients(false),
            BTreeSet::from([uid("u_2"), uid("u_3")])
        );
    }

    #[test]
    fn direct_recipients_are_the_receiver_only() {
        let chat = ChatMessage::new(uid("u_1"), "u_2", ChatContent::text("hi"));
        let delivery = ChatDelivery::direct(chat, User::new(uid("u_2"), "bob", "Bob"));

        assert_eq!(delivery.recipients(true), BTreeSet::from([uid("u_2")]));
    }

    #[test]
    fn delivery_serializes_chat_fields_at_top_level() {
        let chat = ChatMessage::new(uid("u_1"), "u_2", ChatContent::text("hi"));
        let delivery = ChatDelivery::direct(chat, User::new(uid("u_2"), "bob", "Bob"));
        let json = serde_json::to_value(&delivery).unwrap();

        assert_eq!(json["text"], "hi");
        assert_eq!(json["receiver"]["username"], "bob");
        assert!(json.get("group").is_none());
    }
}
