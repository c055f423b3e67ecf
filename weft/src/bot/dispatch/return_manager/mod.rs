//! Handler return values and the per-view managers that act on them.
//!
//! Handlers return a [`Response`]; the view's return manager dispatches on
//! the variant (reply with text, answer the callback query, …). Variants a
//! manager does not understand are ignored.

mod callback_query;
mod message;

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;

pub use callback_query::CallbackQueryReturnManager;
pub use message::MessageReturnManager;

/// What a handler produced for the return manager.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Response {
    /// Nothing to do.
    #[default]
    Ignore,
    /// Plain text: reply (message views) or answer (callback views).
    Text(String),
    /// Several texts, sent one by one.
    Parts(Vec<String>),
    /// Raw `sendMessage` fields; `chat_id` is filled in when absent.
    Fields(serde_json::Map<String, serde_json::Value>),
    /// Text with an explicit parse mode.
    Formatted { text: String, parse_mode: String },
}

impl Response {
    pub fn html(text: impl Into<String>) -> Self {
        Self::Formatted {
            text: text.into(),
            parse_mode: "HTML".into(),
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Formatted {
            text: text.into(),
            parse_mode: "MarkdownV2".into(),
        }
    }
}

/// Conversion from the values handler closures actually return.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::Ignore
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::Text(self)
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response {
        Response::Text(self.to_string())
    }
}

impl IntoResponse for Vec<String> {
    fn into_response(self) -> Response {
        Response::Parts(self)
    }
}

impl IntoResponse for serde_json::Map<String, serde_json::Value> {
    fn into_response(self) -> Response {
        Response::Fields(self)
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> Response {
        match self {
            Some(value) => value.into_response(),
            None => Response::Ignore,
        }
    }
}

/// Dispatches a handler's return value to the matching API call.
#[async_trait]
pub trait ReturnManager: Send + Sync {
    async fn run(&self, response: &Response, event: &Event, ctx: &mut Context);
}
