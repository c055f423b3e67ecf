//! The whole update, bound to its API handle. Produced by the raw adapter
//! and by the raw-event view.

use std::sync::Arc;

use crate::api::Api;
use crate::types::{Update, UpdateType};

use super::{
    BoundCallbackQuery, BoundChatJoinRequest, BoundChatMemberUpdated, BoundInlineQuery,
    BoundMessage, BoundPreCheckoutQuery, Event,
};

#[derive(Clone, Debug)]
pub struct BoundUpdate {
    pub update: Arc<Update>,
    pub api: Api,
}

impl BoundUpdate {
    pub fn new(update: Arc<Update>, api: Api) -> Self {
        Self { update, api }
    }

    pub fn kind(&self) -> Option<UpdateType> {
        self.update.kind()
    }

    pub fn chat_id(&self) -> Option<i64> {
        let u = &self.update;
        u.message_payload()
            .map(|m| m.chat.id)
            .or_else(|| {
                u.callback_query
                    .as_ref()
                    .and_then(|q| q.message.as_ref())
                    .map(|m| m.chat.id)
            })
            .or_else(|| u.chat_join_request.as_ref().map(|r| r.chat.id))
            .or_else(|| u.chat_member.as_ref().map(|m| m.chat.id))
            .or_else(|| u.my_chat_member.as_ref().map(|m| m.chat.id))
    }

    pub fn from_id(&self) -> Option<i64> {
        let u = &self.update;
        u.message_payload()
            .and_then(|m| m.from.as_ref())
            .map(|f| f.id)
            .or_else(|| u.callback_query.as_ref().map(|q| q.from.id))
            .or_else(|| u.inline_query.as_ref().map(|q| q.from.id))
            .or_else(|| u.chat_join_request.as_ref().map(|r| r.from.id))
            .or_else(|| u.chat_member.as_ref().map(|m| m.from.id))
            .or_else(|| u.my_chat_member.as_ref().map(|m| m.from.id))
            .or_else(|| u.pre_checkout_query.as_ref().map(|q| q.from.id))
    }

    /// The typed event for this update's payload, when the kind is known.
    pub fn to_event(&self) -> Option<Event> {
        let api = self.api.clone();
        let u = &self.update;
        let kind = u.kind()?;
        let event = match kind {
            UpdateType::Message
            | UpdateType::EditedMessage
            | UpdateType::ChannelPost
            | UpdateType::EditedChannelPost => Event::Message(BoundMessage::new(
                u.message_payload()?.clone(),
                kind,
                api,
            )),
            UpdateType::CallbackQuery => {
                Event::CallbackQuery(BoundCallbackQuery::new(u.callback_query.clone()?, api))
            }
            UpdateType::InlineQuery => {
                Event::InlineQuery(BoundInlineQuery::new(u.inline_query.clone()?, api))
            }
            UpdateType::ChatJoinRequest => {
                Event::ChatJoinRequest(BoundChatJoinRequest::new(u.chat_join_request.clone()?, api))
            }
            UpdateType::ChatMember => Event::ChatMember(BoundChatMemberUpdated::new(
                u.chat_member.clone()?,
                UpdateType::ChatMember,
                api,
            )),
            UpdateType::MyChatMember => Event::ChatMember(BoundChatMemberUpdated::new(
                u.my_chat_member.clone()?,
                UpdateType::MyChatMember,
                api,
            )),
            UpdateType::PreCheckoutQuery => Event::PreCheckoutQuery(BoundPreCheckoutQuery::new(
                u.pre_checkout_query.clone()?,
                api,
            )),
        };
        Some(event)
    }
}
