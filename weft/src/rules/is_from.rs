//! Sender and chat gates.

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::node::NodeCollection;
use crate::types::ChatType;

use super::Rule;

/// Event sender is one of the given user ids.
pub struct IsUserId(pub Vec<i64>);

impl IsUserId {
    pub fn one(id: i64) -> Self {
        Self(vec![id])
    }
}

#[async_trait]
impl Rule for IsUserId {
    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event.from_id().map(|id| self.0.contains(&id)).unwrap_or(false)
    }
}

/// Event chat is one of the given chat ids.
pub struct IsChatId(pub Vec<i64>);

impl IsChatId {
    pub fn one(id: i64) -> Self {
        Self(vec![id])
    }
}

#[async_trait]
impl Rule for IsChatId {
    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event.chat_id().map(|id| self.0.contains(&id)).unwrap_or(false)
    }
}

fn chat_type(event: &Event) -> Option<ChatType> {
    match event {
        Event::Message(m) => Some(m.message.chat.kind),
        Event::CallbackQuery(q) => q.message().map(|m| m.chat.kind),
        Event::ChatJoinRequest(r) => Some(r.request.chat.kind),
        Event::ChatMember(u) => Some(u.updated.chat.kind),
        Event::Raw(u) => u.update.message_payload().map(|m| m.chat.kind),
        _ => None,
    }
}

/// The event happened in a private dialog.
pub struct IsPrivate;

#[async_trait]
impl Rule for IsPrivate {
    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        chat_type(event) == Some(ChatType::Private)
    }
}

/// The event happened in a group or supergroup.
pub struct IsGroup;

#[async_trait]
impl Rule for IsGroup {
    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        matches!(chat_type(event), Some(ChatType::Group | ChatType::Supergroup))
    }
}
