//! Adapters: convert a raw update into the typed event a rule or
//! middleware runs on, or fail with "does not apply".

use std::sync::Arc;

use thiserror::Error;

use crate::api::Api;
use crate::bot::bound::{BoundUpdate, Event};
use crate::types::{Update, UpdateType};

/// Update kinds carrying a message payload.
pub const MESSAGE_KINDS: &[UpdateType] = &[
    UpdateType::Message,
    UpdateType::EditedMessage,
    UpdateType::ChannelPost,
    UpdateType::EditedChannelPost,
];

/// Update kinds carrying a chat member transition.
pub const CHAT_MEMBER_KINDS: &[UpdateType] =
    &[UpdateType::ChatMember, UpdateType::MyChatMember];

/// The update does not match the expected event kind. Treated as "rule does
/// not apply": checks return false, the error never reaches the user.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("update carries no known payload")]
    UnknownKind,

    #[error("update is {actual}, adapter expects {expected:?}")]
    KindMismatch {
        expected: &'static [UpdateType],
        actual: UpdateType,
    },
}

/// Which adaptation a rule, handler or middleware declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterSpec {
    /// The whole update as [`Event::Raw`]; never fails.
    Raw,
    /// The typed payload for one of the listed update kinds.
    Event(&'static [UpdateType]),
}

impl AdapterSpec {
    /// Shorthand for the message-like kinds.
    pub fn message() -> Self {
        Self::Event(MESSAGE_KINDS)
    }

    pub fn adapt(&self, api: &Api, update: &Arc<Update>) -> Result<Event, AdapterError> {
        let bound = BoundUpdate::new(update.clone(), api.clone());
        match self {
            Self::Raw => Ok(Event::Raw(bound)),
            Self::Event(expected) => {
                let actual = update.kind().ok_or(AdapterError::UnknownKind)?;
                if !expected.contains(&actual) {
                    return Err(AdapterError::KindMismatch { expected, actual });
                }
                bound.to_event().ok_or(AdapterError::UnknownKind)
            }
        }
    }
}
