//! Return manager for callback query views: text becomes the query answer.

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;

use super::{Response, ReturnManager};

#[derive(Clone, Copy, Debug, Default)]
pub struct CallbackQueryReturnManager;

#[async_trait]
impl ReturnManager for CallbackQueryReturnManager {
    async fn run(&self, response: &Response, event: &Event, _ctx: &mut Context) {
        let Some(query) = event.as_callback_query() else {
            return;
        };
        let text = match response {
            Response::Text(text) => text.as_str(),
            Response::Formatted { text, .. } => text.as_str(),
            // Other shapes have no meaning for a query answer.
            _ => return,
        };
        if let Err(error) = query.answer_text(text, false).await {
            tracing::warn!(error = %error, "return manager answerCallbackQuery failed");
        }
    }
}
