//! Return manager for message views: handler output becomes replies in the
//! event's chat.

use async_trait::async_trait;

use crate::api::SendMessageParams;
use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::client::Form;

use super::{Response, ReturnManager};

#[derive(Clone, Copy, Debug, Default)]
pub struct MessageReturnManager;

impl MessageReturnManager {
    async fn send(&self, event: &Event, params: SendMessageParams) {
        if let Err(error) = event.api().send_message(params).await {
            tracing::warn!(error = %error, "return manager sendMessage failed");
        }
    }
}

#[async_trait]
impl ReturnManager for MessageReturnManager {
    async fn run(&self, response: &Response, event: &Event, _ctx: &mut Context) {
        let Some(message) = event.as_message() else {
            return;
        };
        let chat_id = message.chat_id();
        let thread = message.message.message_thread_id;

        match response {
            Response::Ignore => {}
            Response::Text(text) => {
                self.send(event, SendMessageParams::new(chat_id, text).thread(thread))
                    .await;
            }
            Response::Parts(parts) => {
                for part in parts {
                    self.send(event, SendMessageParams::new(chat_id, part).thread(thread))
                        .await;
                }
            }
            Response::Fields(fields) => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.field(name, value);
                }
                if !fields.contains_key("chat_id") {
                    form = form.field("chat_id", chat_id);
                }
                if let Err(error) = event.api().request("sendMessage", form).await {
                    tracing::warn!(error = %error, "return manager sendMessage failed");
                }
            }
            Response::Formatted { text, parse_mode } => {
                self.send(
                    event,
                    SendMessageParams::new(chat_id, text)
                        .thread(thread)
                        .parse_mode(parse_mode),
                )
                .await;
            }
        }
    }
}
