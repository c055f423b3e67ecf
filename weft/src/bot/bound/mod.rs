//! Bound event types: one typed payload plus the [`Api`] handle it arrived
//! through, with the convenience calls handlers actually make.
//!
//! The [`Event`] sum type is what adapters produce and what flows through
//! rules, middlewares and the waiter machine.

mod callback_query;
mod chat_join_request;
mod chat_member;
mod inline_query;
mod message;
mod pre_checkout_query;
mod update;

use crate::api::Api;
use crate::types::UpdateType;

pub use callback_query::BoundCallbackQuery;
pub use chat_join_request::BoundChatJoinRequest;
pub use chat_member::BoundChatMemberUpdated;
pub use inline_query::BoundInlineQuery;
pub use message::BoundMessage;
pub use pre_checkout_query::BoundPreCheckoutQuery;
pub use update::BoundUpdate;

/// An adapted update: the typed payload a view pipeline runs on.
#[derive(Clone, Debug)]
pub enum Event {
    Raw(BoundUpdate),
    Message(BoundMessage),
    CallbackQuery(BoundCallbackQuery),
    InlineQuery(BoundInlineQuery),
    ChatJoinRequest(BoundChatJoinRequest),
    ChatMember(BoundChatMemberUpdated),
    PreCheckoutQuery(BoundPreCheckoutQuery),
}

impl Event {
    pub fn api(&self) -> &Api {
        match self {
            Self::Raw(e) => &e.api,
            Self::Message(e) => &e.api,
            Self::CallbackQuery(e) => &e.api,
            Self::InlineQuery(e) => &e.api,
            Self::ChatJoinRequest(e) => &e.api,
            Self::ChatMember(e) => &e.api,
            Self::PreCheckoutQuery(e) => &e.api,
        }
    }

    /// Chat the event happened in, when it has one.
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            Self::Raw(e) => e.chat_id(),
            Self::Message(e) => Some(e.chat_id()),
            Self::CallbackQuery(e) => e.chat_id(),
            Self::InlineQuery(_) => None,
            Self::ChatJoinRequest(e) => Some(e.request.chat.id),
            Self::ChatMember(e) => Some(e.updated.chat.id),
            Self::PreCheckoutQuery(_) => None,
        }
    }

    /// Sender of the event, when it has one.
    pub fn from_id(&self) -> Option<i64> {
        match self {
            Self::Raw(e) => e.from_id(),
            Self::Message(e) => e.message.from.as_ref().map(|u| u.id),
            Self::CallbackQuery(e) => Some(e.query.from.id),
            Self::InlineQuery(e) => Some(e.query.from.id),
            Self::ChatJoinRequest(e) => Some(e.request.from.id),
            Self::ChatMember(e) => Some(e.updated.from.id),
            Self::PreCheckoutQuery(e) => Some(e.query.from.id),
        }
    }

    /// Message text for message events, callback data for callback events.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message(e) => e.text(),
            Self::Raw(e) => e.update.message_payload().and_then(|m| m.text.as_deref()),
            Self::CallbackQuery(e) => e.query.data.as_deref(),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&BoundMessage> {
        match self {
            Self::Message(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_callback_query(&self) -> Option<&BoundCallbackQuery> {
        match self {
            Self::CallbackQuery(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<UpdateType> {
        match self {
            Self::Raw(e) => e.update.kind(),
            Self::Message(e) => e.kind,
            Self::CallbackQuery(_) => Some(UpdateType::CallbackQuery),
            Self::InlineQuery(_) => Some(UpdateType::InlineQuery),
            Self::ChatJoinRequest(_) => Some(UpdateType::ChatJoinRequest),
            Self::ChatMember(e) => Some(e.kind),
            Self::PreCheckoutQuery(_) => Some(UpdateType::PreCheckoutQuery),
        }
    }
}

macro_rules! event_conversions {
    ($($variant:ident => $bound:ty),+ $(,)?) => {
        $(
            impl From<$bound> for Event {
                fn from(value: $bound) -> Self {
                    Event::$variant(value)
                }
            }

            impl TryFrom<Event> for $bound {
                type Error = Event;

                fn try_from(event: Event) -> Result<Self, Event> {
                    match event {
                        Event::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

event_conversions! {
    Raw => BoundUpdate,
    Message => BoundMessage,
    CallbackQuery => BoundCallbackQuery,
    InlineQuery => BoundInlineQuery,
    ChatJoinRequest => BoundChatJoinRequest,
    ChatMember => BoundChatMemberUpdated,
    PreCheckoutQuery => BoundPreCheckoutQuery,
}
