//! End-to-end scenarios over the mock transport: updates go in through the
//! dispatcher, replies come out as recorded API calls.

use std::sync::Arc;

use weft::bot::{BoundMessage, Event};
use weft::client::{Form, MockClient};
use weft::node::Source;
use weft::rules::{Argument, Command, HasText, RuleExt, Text};
use weft::tools::HandlerError;
use weft::types::{CallbackQuery, Chat, ChatType, Message, Update, UpdateType, User};
use weft::{Api, Dispatcher, Response, Token, WaitOptions, WaiterMachine};

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

fn message(update_id: i64, chat_id: i64, text: &str) -> Arc<Update> {
    Arc::new(Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            date: 0,
            chat: Chat {
                id: chat_id,
                kind: ChatType::Private,
                title: None,
                username: None,
                first_name: None,
            },
            from: Some(user(chat_id)),
            message_thread_id: None,
            text: Some(text.into()),
            caption: None,
            entities: vec![],
            photo: vec![],
            document: None,
            reply_to_message: None,
        }),
        ..Default::default()
    })
}

fn callback(update_id: i64, chat_id: i64, data: &str) -> Arc<Update> {
    let msg = message(update_id, chat_id, "menu");
    Arc::new(Update {
        update_id,
        callback_query: Some(CallbackQuery {
            id: format!("cq{update_id}"),
            from: user(900),
            message: msg.message.clone(),
            chat_instance: None,
            data: Some(data.into()),
        }),
        ..Default::default()
    })
}

/// Mock that answers `sendMessage` with a plausible message payload so the
/// typed API call decodes.
fn scripted_client() -> MockClient {
    MockClient::new().with_responder(|url: &str, form: &Form| {
        if url.ends_with("sendMessage") {
            serde_json::json!({
                "ok": true,
                "result": {
                    "message_id": 1000,
                    "date": 0,
                    "chat": {"id": form.fields()["chat_id"], "type": "private"},
                    "text": form.fields().get("text").cloned().unwrap_or_default()
                }
            })
        } else {
            serde_json::json!({"ok": true, "result": true})
        }
    })
}

fn api_with(client: &MockClient) -> Api {
    Api::new(Token::new("99:e2e").unwrap(), Arc::new(client.clone()))
}

/// **Scenario**: `/start` runs the `Text("/start")` handler, producing one
/// `sendMessage` with `text = "Hi"`.
#[tokio::test]
async fn text_command_match() {
    let client = scripted_client();
    let api = api_with(&client);

    let mut dispatcher = Dispatcher::new();
    dispatcher.message.on::<BoundMessage, (), _, _>(
        vec![Text::new("/start").arc()],
        |_message, _ctx, _nodes| async move { Ok(Response::Text("Hi".into())) },
    );

    assert!(dispatcher.feed(message(1, 7, "/start"), &api).await);

    let sends = client.requests_for("sendMessage");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].fields["text"], "Hi");
    assert_eq!(sends[0].fields["chat_id"], 7);
}

/// **Scenario**: Rule AND context merge — `/sum 2 3` binds x and y, the
/// handler replies `5`.
#[tokio::test]
async fn command_arguments_merge_into_context() {
    let client = scripted_client();
    let api = api_with(&client);

    let mut dispatcher = Dispatcher::new();
    dispatcher.message.on::<BoundMessage, (), _, _>(
        vec![Command::new("sum")
            .arg(Argument::int("x"))
            .arg(Argument::int("y"))
            .arc()],
        |_message, ctx, _nodes| async move {
            let x = ctx.get::<i64>("x").map(|v| *v).unwrap_or(0);
            let y = ctx.get::<i64>("y").map(|v| *v).unwrap_or(0);
            Ok(Response::Text((x + y).to_string()))
        },
    );

    assert!(dispatcher.feed(message(1, 5, "/sum 2 3"), &api).await);
    let sends = client.requests_for("sendMessage");
    assert_eq!(sends[0].fields["text"], "5");

    // A malformed argument does not match at all.
    assert!(!dispatcher.feed(message(2, 5, "/sum two 3"), &api).await);
    assert_eq!(client.requests_for("sendMessage").len(), 1);
}

/// **Scenario**: Waiter happy path — `/ask` suspends; the next text message
/// in the same chat releases it and the handler replies `got: answer`.
#[tokio::test]
async fn waiter_happy_path() {
    let client = scripted_client();
    let api = api_with(&client);

    let machine = WaiterMachine::new();
    let mut dispatcher = Dispatcher::new();
    let hasher = machine.attach(&dispatcher.message);

    let wait_machine = machine.clone();
    dispatcher.message.on::<BoundMessage, (), _, _>(
        vec![Text::new("/ask").arc()],
        move |message, _ctx, _nodes| {
            let machine = wait_machine.clone();
            let hasher = hasher.clone();
            async move {
                let (event, _ctx) = machine
                    .wait_hashed(
                        &hasher,
                        &Event::Message(message.clone()),
                        WaitOptions::new().release(HasText.arc()),
                    )
                    .await
                    .map_err(HandlerError::new)?;
                let answer = event.text().unwrap_or_default().to_string();
                Ok(Response::Text(format!("got: {answer}")))
            }
        },
    );
    let dispatcher = Arc::new(dispatcher);

    let ask = {
        let dispatcher = dispatcher.clone();
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(message(1, 42, "/ask"), &api).await })
    };
    tokio::task::yield_now().await;

    // The answer is consumed by the waiter middleware, not by handlers.
    assert!(!dispatcher.feed(message(2, 42, "answer"), &api).await);
    assert!(ask.await.unwrap());

    let sends = client.requests_for("sendMessage");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].fields["text"], "got: answer");
    assert_eq!(sends[0].fields["chat_id"], 42);
}

/// **Scenario**: Polymorphic `Source` — from a message update the source
/// chat is the message chat; from a callback query it is the query's chat.
#[tokio::test]
async fn polymorphic_source_node() {
    let client = scripted_client();
    let api = api_with(&client);

    let mut dispatcher = Dispatcher::new();
    dispatcher.message.on::<BoundMessage, (Arc<Source>,), _, _>(
        vec![],
        |_message, _ctx, (source,): (Arc<Source>,)| async move {
            Ok(Response::Text(format!("chat:{}", source.chat.id)))
        },
    );
    dispatcher
        .callback_query
        .on::<weft::bot::BoundCallbackQuery, (Arc<Source>,), _, _>(
            vec![],
            |query, _ctx, (source,): (Arc<Source>,)| async move {
                query
                    .answer_text(&format!("chat:{}", source.chat.id), false)
                    .await?;
                Ok(Response::Ignore)
            },
        );

    assert!(dispatcher.feed(message(1, 11, "hello"), &api).await);
    let sends = client.requests_for("sendMessage");
    assert_eq!(sends[0].fields["text"], "chat:11");

    assert!(dispatcher.feed(callback(2, 11, "pick"), &api).await);
    let answers = client.requests_for("answerCallbackQuery");
    assert_eq!(answers[0].fields["text"], "chat:11");
}

/// **Scenario**: For a known update kind, exactly one typed view claims it.
#[tokio::test]
async fn exactly_one_typed_view_claims() {
    let dispatcher = Dispatcher::new();
    let update = message(1, 1, "x");
    let claims = [
        dispatcher.callback_query.check(&update),
        dispatcher.chat_join_request.check(&update),
        dispatcher.chat_member.check(&update),
        dispatcher.inline_query.check(&update),
        dispatcher.message.check(&update),
        dispatcher.pre_checkout_query.check(&update),
    ];
    assert_eq!(claims.iter().filter(|c| **c).count(), 1);
    assert!(claims[4], "the message view must be the claimant");

    let update = callback(2, 1, "d");
    let claims = [
        dispatcher.callback_query.check(&update),
        dispatcher.chat_join_request.check(&update),
        dispatcher.chat_member.check(&update),
        dispatcher.inline_query.check(&update),
        dispatcher.message.check(&update),
        dispatcher.pre_checkout_query.check(&update),
    ];
    assert_eq!(claims.iter().filter(|c| **c).count(), 1);
    assert!(claims[0], "the callback view must be the claimant");
}

/// **Scenario**: UpdateType names parse back for the allowed_updates list.
#[test]
fn allowed_updates_names() {
    for kind in UpdateType::all() {
        assert_eq!(kind.name().parse::<UpdateType>().unwrap(), *kind);
    }
}
