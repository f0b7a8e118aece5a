//! Group record as exposed by the directory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, Timestamp, UserId};

/// A group chat. The relay only reads membership to compute fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub member_ids: BTreeSet<UserId>,
    #[serde(default)]
    pub admin_ids: BTreeSet<UserId>,
    pub created_by: UserId,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Group {
    /// Creates a group whose creator is both its first member and its admin.
    pub fn new(id: GroupId, name: impl Into<String>, created_by: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            name: name.into(),
            member_ids: BTreeSet::from([created_by.clone()]),
            admin_ids: BTreeSet::from([created_by.clone()]),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds members, ignoring ids that are already present.
    pub fn with_members(mut self, members: impl IntoIterator<Item = UserId>) -> Self {
        self.member_ids.extend(members);
        self
    }

    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.member_ids.contains(user_id)
    }
}
