//! A message payload bound to the API: answer/reply/delete in one call.

use crate::api::{Api, ApiError, SendMessageParams};
use crate::types::{Message, UpdateType};

#[derive(Clone, Debug)]
pub struct BoundMessage {
    pub message: Message,
    /// Which message-like update kind delivered it.
    pub kind: Option<UpdateType>,
    pub api: Api,
}

impl BoundMessage {
    pub fn new(message: Message, kind: UpdateType, api: Api) -> Self {
        Self {
            message,
            kind: Some(kind),
            api,
        }
    }

    /// Wraps a message that did not arrive as an update payload (e.g. the
    /// message attached to a callback query).
    pub fn detached(message: Message, api: Api) -> Self {
        Self {
            message,
            kind: None,
            api,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.message.chat.id
    }

    pub fn text(&self) -> Option<&str> {
        self.message.text.as_deref()
    }

    /// Sends `text` to the same chat (and thread, when present).
    pub async fn answer(&self, text: impl Into<String>) -> Result<Message, ApiError> {
        self.api
            .send_message(
                SendMessageParams::new(self.chat_id(), text)
                    .thread(self.message.message_thread_id),
            )
            .await
    }

    /// Sends `text` as a reply to this message.
    pub async fn reply(&self, text: impl Into<String>) -> Result<Message, ApiError> {
        self.api
            .send_message(
                SendMessageParams::new(self.chat_id(), text)
                    .thread(self.message.message_thread_id)
                    .reply_to(self.message.message_id),
            )
            .await
    }

    pub async fn delete(&self) -> Result<bool, ApiError> {
        self.api
            .delete_message(self.chat_id(), self.message.message_id)
            .await
    }
}

impl std::ops::Deref for BoundMessage {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}
