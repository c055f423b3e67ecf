//! Shared fixtures for rule tests: canned updates and a one-call checker.

use std::sync::Arc;

use crate::api::{Api, Token};
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::process::check_rule;
use crate::client::MockClient;
use crate::types::{CallbackQuery, Chat, ChatType, Message, Update, User};

use super::ArcRule;

pub fn api() -> Api {
    Api::new(Token::new("7:test").unwrap(), Arc::new(MockClient::new()))
}

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: "u".into(),
        last_name: None,
        username: None,
        language_code: None,
    }
}

pub fn chat(id: i64, kind: ChatType) -> Chat {
    Chat {
        id,
        kind,
        title: None,
        username: None,
        first_name: None,
    }
}

pub fn message(chat_id: i64, text: &str) -> Message {
    Message {
        message_id: 1,
        date: 0,
        chat: chat(chat_id, ChatType::Private),
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

pub fn message_update(text: &str) -> Arc<Update> {
    Arc::new(Update {
        update_id: 1,
        message: Some(message(100, text)),
        ..Default::default()
    })
}

pub fn callback_update(data: &str) -> Arc<Update> {
    Arc::new(Update {
        update_id: 2,
        callback_query: Some(CallbackQuery {
            id: "cq".into(),
            from: user(100),
            message: Some(message(100, "menu")),
            chat_instance: None,
            data: Some(data.into()),
        }),
        ..Default::default()
    })
}

/// Runs the full check algorithm against a fresh context.
pub async fn check(rule: &ArcRule, update: Arc<Update>) -> bool {
    let api = api();
    let mut ctx = Context::new(update.clone());
    check_rule(&api, rule, &update, &mut ctx).await
}

/// Same as [`check`] but hands back the context for merge assertions.
pub async fn check_with_ctx(rule: &ArcRule, update: Arc<Update>) -> (bool, Context) {
    let api = api();
    let mut ctx = Context::new(update.clone());
    let passed = check_rule(&api, rule, &update, &mut ctx).await;
    (passed, ctx)
}
