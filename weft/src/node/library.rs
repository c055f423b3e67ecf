//! The built-in node library: event-derived values handlers commonly ask
//! for, plus the `Me` global.

use crate::api::Api;
use crate::bot::bound::{BoundCallbackQuery, BoundMessage, BoundUpdate, Event};
use crate::types::{Chat, User};

use super::{ComposeError, Composer, Morph, Node, Polymorphic, Scope};

/// The whole bound update.
pub struct UpdateNode(pub BoundUpdate);

#[async_trait::async_trait]
impl Node for UpdateNode {
    const SCOPE: Scope = Scope::PerEvent;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        Ok(Self(composer.bound_update().clone()))
    }
}

/// The message payload of the current update; fails for non-message kinds.
pub struct MessageNode(pub BoundMessage);

#[async_trait::async_trait]
impl Node for MessageNode {
    const SCOPE: Scope = Scope::PerEvent;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        match composer.bound_update().to_event() {
            Some(Event::Message(message)) => Ok(Self(message)),
            _ => Err(ComposeError::failed("update is not a message")),
        }
    }
}

impl std::ops::Deref for MessageNode {
    type Target = BoundMessage;

    fn deref(&self) -> &BoundMessage {
        &self.0
    }
}

/// The callback query payload of the current update.
pub struct CallbackQueryNode(pub BoundCallbackQuery);

#[async_trait::async_trait]
impl Node for CallbackQueryNode {
    const SCOPE: Scope = Scope::PerEvent;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        match composer.bound_update().to_event() {
            Some(Event::CallbackQuery(query)) => Ok(Self(query)),
            _ => Err(ComposeError::failed("update is not a callback query")),
        }
    }
}

impl std::ops::Deref for CallbackQueryNode {
    type Target = BoundCallbackQuery;

    fn deref(&self) -> &BoundCallbackQuery {
        &self.0
    }
}

/// Scalar node: the message text.
pub struct Text(pub String);

#[async_trait::async_trait]
impl Node for Text {
    const SCOPE: Scope = Scope::PerEvent;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let message = composer.resolve::<MessageNode>().await?;
        match message.text() {
            Some(text) => Ok(Self(text.to_string())),
            None => Err(ComposeError::failed("message has no text")),
        }
    }
}

impl std::ops::Deref for Text {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Scalar node: the message text parsed as an integer.
pub struct TextInteger(pub i64);

#[async_trait::async_trait]
impl Node for TextInteger {
    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let text = composer.resolve::<Text>().await?;
        text.trim()
            .parse()
            .map(Self)
            .map_err(|_| ComposeError::failed("text is not an integer"))
    }
}

/// Scalar node: the callback query payload string.
pub struct Payload(pub String);

#[async_trait::async_trait]
impl Node for Payload {
    const SCOPE: Scope = Scope::PerEvent;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let query = composer.resolve::<CallbackQueryNode>().await?;
        match query.data() {
            Some(data) => Ok(Self(data.to_string())),
            None => Err(ComposeError::failed("callback query carries no data")),
        }
    }
}

/// Where the event came from: chat, sender, and optional thread.
///
/// Polymorphic: composes from a message update or from a callback query on
/// the same chat, in that order.
pub struct Source {
    pub api: Api,
    pub chat: Chat,
    pub from_user: User,
    pub thread_id: Option<i64>,
}

impl Source {
    /// Sends `text` to the source chat (and thread, when present).
    pub async fn send(&self, text: impl Into<String>) -> Result<crate::types::Message, crate::api::ApiError> {
        self.api
            .send_message(
                crate::api::SendMessageParams::new(self.chat.id, text).thread(self.thread_id),
            )
            .await
    }
}

impl Polymorphic for Source {
    const SCOPE: Scope = Scope::PerEvent;

    fn morphs() -> Vec<Morph<Self>> {
        vec![
            Morph {
                name: "from_message",
                compose: |composer: &mut Composer| {
                    Box::pin(async move {
                        let message = composer.resolve::<MessageNode>().await?;
                        let from_user = message
                            .message
                            .from
                            .clone()
                            .ok_or_else(|| ComposeError::failed("message has no sender"))?;
                        Ok(Source {
                            api: message.api.clone(),
                            chat: message.message.chat.clone(),
                            from_user,
                            thread_id: message.message.message_thread_id,
                        })
                    })
                },
            },
            Morph {
                name: "from_callback_query",
                compose: |composer: &mut Composer| {
                    Box::pin(async move {
                        let query = composer.resolve::<CallbackQueryNode>().await?;
                        let message = query
                            .message()
                            .ok_or_else(|| ComposeError::failed("callback query has no chat"))?;
                        Ok(Source {
                            api: query.api.clone(),
                            chat: message.chat.clone(),
                            from_user: query.query.from.clone(),
                            thread_id: message.message_thread_id,
                        })
                    })
                },
            },
        ]
    }
}

/// Scalar node: the source chat.
pub struct ChatSource(pub Chat);

#[async_trait::async_trait]
impl Node for ChatSource {
    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let source = composer.resolve::<Source>().await?;
        Ok(Self(source.chat.clone()))
    }
}

/// Scalar node: the source user.
pub struct UserSource(pub User);

#[async_trait::async_trait]
impl Node for UserSource {
    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let source = composer.resolve::<Source>().await?;
        Ok(Self(source.from_user.clone()))
    }
}

/// The bot's own user, fetched once per process via `getMe`.
pub struct Me(pub User);

#[async_trait::async_trait]
impl Node for Me {
    const SCOPE: Scope = Scope::Global;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let me = composer
            .api()
            .get_me()
            .await
            .map_err(|err| ComposeError::failed(format!("getMe failed: {err}")))?;
        Ok(Self(me))
    }
}

/// The typed payload of the current update, for any bound event type.
pub struct EventNode<T>(pub T);

#[async_trait::async_trait]
impl<T> Node for EventNode<T>
where
    T: TryFrom<Event> + Send + Sync + 'static,
{
    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let event = composer
            .bound_update()
            .to_event()
            .ok_or_else(|| ComposeError::failed("update carries no known payload"))?;
        T::try_from(event)
            .map(Self)
            .map_err(|_| ComposeError::failed("update payload has another type"))
    }
}

/// Capability shorthand: the API handle as a node.
pub struct ApiNode(pub Api);

#[async_trait::async_trait]
impl Node for ApiNode {
    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        Ok(Self(composer.api().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::Token;
    use crate::bot::dispatch::context::Context;
    use crate::client::MockClient;
    use crate::node::{compose_nodes, NodeSpec};
    use crate::types::{CallbackQuery, ChatType, Message, Update};

    fn api(client: MockClient) -> Api {
        Api::new(Token::new("9:t").unwrap(), Arc::new(client))
    }

    fn chat(id: i64) -> Chat {
        Chat {
            id,
            kind: ChatType::Private,
            title: None,
            username: None,
            first_name: Some("u".into()),
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            is_bot: false,
            first_name: "u".into(),
            last_name: None,
            username: None,
            language_code: None,
        }
    }

    fn message(chat_id: i64, text: &str) -> Message {
        Message {
            message_id: 1,
            date: 0,
            chat: chat(chat_id),
            from: Some(user(chat_id)),
            message_thread_id: None,
            text: Some(text.into()),
            caption: None,
            entities: vec![],
            photo: vec![],
            document: None,
            reply_to_message: None,
        }
    }

    fn message_update(chat_id: i64, text: &str) -> Arc<Update> {
        Arc::new(Update {
            update_id: 1,
            message: Some(message(chat_id, text)),
            ..Default::default()
        })
    }

    fn callback_update(chat_id: i64) -> Arc<Update> {
        Arc::new(Update {
            update_id: 2,
            callback_query: Some(CallbackQuery {
                id: "cq".into(),
                from: user(77),
                message: Some(message(chat_id, "menu")),
                chat_instance: None,
                data: Some("pick".into()),
            }),
            ..Default::default()
        })
    }

    async fn compose_source(update: Arc<Update>) -> Result<Arc<Source>, ComposeError> {
        let api = api(MockClient::new());
        let bound = BoundUpdate::new(update.clone(), api.clone());
        let mut ctx = Context::new(update.clone());
        let mut col =
            compose_nodes(&[NodeSpec::of::<Source>()], &mut ctx, &api, &update, &bound).await?;
        let source = col.get::<Source>().ok_or(ComposeError::Missing("Source"))?;
        col.close_all();
        Ok(source)
    }

    /// **Scenario**: Source composes from a message update with the message chat.
    #[tokio::test]
    async fn source_from_message() {
        let source = compose_source(message_update(10, "hi")).await.unwrap();
        assert_eq!(source.chat.id, 10);
        assert_eq!(source.from_user.id, 10);
    }

    /// **Scenario**: Source composes from a callback query with the message's
    /// chat and the query's sender.
    #[tokio::test]
    async fn source_from_callback_query() {
        let source = compose_source(callback_update(10)).await.unwrap();
        assert_eq!(source.chat.id, 10);
        assert_eq!(source.from_user.id, 77);
    }

    /// **Scenario**: Text and TextInteger chain; non-numeric text fails the chain.
    #[tokio::test]
    async fn text_integer_chain() {
        let update = message_update(1, " 42 ");
        let api = api(MockClient::new());
        let bound = BoundUpdate::new(update.clone(), api.clone());
        let mut ctx = Context::new(update.clone());
        let mut col = compose_nodes(
            &[NodeSpec::of::<TextInteger>()],
            &mut ctx,
            &api,
            &update,
            &bound,
        )
        .await
        .unwrap();
        assert_eq!(col.get::<TextInteger>().unwrap().0, 42);
        col.close_all();

        let update = message_update(1, "not a number");
        let bound = BoundUpdate::new(update.clone(), api.clone());
        let mut ctx = Context::new(update.clone());
        let err = compose_nodes(
            &[NodeSpec::of::<TextInteger>()],
            &mut ctx,
            &api,
            &update,
            &bound,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComposeError::Failed(_)));
    }

    /// **Scenario**: Me is composed once per process and reused after.
    #[tokio::test]
    async fn me_is_global() {
        crate::node::reset_global::<Me>();
        let client = MockClient::new();
        client.push_response(serde_json::json!({
            "ok": true,
            "result": {"id": 9, "is_bot": true, "first_name": "bot"}
        }));
        let api = api(client.clone());
        for _ in 0..2 {
            let update = message_update(1, "x");
            let bound = BoundUpdate::new(update.clone(), api.clone());
            let mut ctx = Context::new(update.clone());
            let mut col =
                compose_nodes(&[NodeSpec::of::<Me>()], &mut ctx, &api, &update, &bound)
                    .await
                    .unwrap();
            assert_eq!(col.get::<Me>().unwrap().0.id, 9);
            col.close_all();
        }
        assert_eq!(client.requests_for("getMe").len(), 1, "getMe must run once");
    }
}
