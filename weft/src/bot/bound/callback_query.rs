//! A callback query bound to the API.

use crate::api::{Api, ApiError};
use crate::types::{CallbackQuery, Message};

#[derive(Clone, Debug)]
pub struct BoundCallbackQuery {
    pub query: CallbackQuery,
    pub api: Api,
}

impl BoundCallbackQuery {
    pub fn new(query: CallbackQuery, api: Api) -> Self {
        Self { query, api }
    }

    /// Chat of the message the pressed keyboard was attached to.
    pub fn chat_id(&self) -> Option<i64> {
        self.query.message.as_ref().map(|m| m.chat.id)
    }

    pub fn message(&self) -> Option<&Message> {
        self.query.message.as_ref()
    }

    pub fn data(&self) -> Option<&str> {
        self.query.data.as_deref()
    }

    /// Dismisses the progress indicator with no notification.
    pub async fn answer(&self) -> Result<bool, ApiError> {
        self.api
            .answer_callback_query(&self.query.id, None, false)
            .await
    }

    /// Answers with a toast (or an alert box when `show_alert`).
    pub async fn answer_text(&self, text: &str, show_alert: bool) -> Result<bool, ApiError> {
        self.api
            .answer_callback_query(&self.query.id, Some(text), show_alert)
            .await
    }

    /// Edits the text of the message the query originated from.
    pub async fn edit_text(&self, text: &str) -> Result<Message, ApiError> {
        let message = self
            .message()
            .ok_or_else(|| ApiError::api(400, "callback query has no message to edit"))?;
        self.api
            .edit_message_text(message.chat.id, message.message_id, text)
            .await
    }
}

impl std::ops::Deref for BoundCallbackQuery {
    type Target = CallbackQuery;

    fn deref(&self) -> &CallbackQuery {
        &self.query
    }
}
