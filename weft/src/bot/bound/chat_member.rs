//! A chat member transition bound to the API; covers both `chat_member`
//! and `my_chat_member` update kinds.

use crate::api::Api;
use crate::types::{ChatMemberStatus, ChatMemberUpdated, UpdateType};

#[derive(Clone, Debug)]
pub struct BoundChatMemberUpdated {
    pub updated: ChatMemberUpdated,
    pub kind: UpdateType,
    pub api: Api,
}

impl BoundChatMemberUpdated {
    pub fn new(updated: ChatMemberUpdated, kind: UpdateType, api: Api) -> Self {
        Self { updated, kind, api }
    }

    pub fn chat_id(&self) -> i64 {
        self.updated.chat.id
    }

    /// True when the transition is an effective join (non-member → member).
    pub fn is_join(&self) -> bool {
        !matches!(
            self.updated.old_chat_member.status,
            ChatMemberStatus::Member | ChatMemberStatus::Creator | ChatMemberStatus::Administrator
        ) && matches!(
            self.updated.new_chat_member.status,
            ChatMemberStatus::Member | ChatMemberStatus::Creator | ChatMemberStatus::Administrator
        )
    }
}

impl std::ops::Deref for BoundChatMemberUpdated {
    type Target = ChatMemberUpdated;

    fn deref(&self) -> &ChatMemberUpdated {
        &self.updated
    }
}
