//! Echo bot: replies to any text message with the same text.
//!
//! Run with `BOT_TOKEN=<token> cargo run -p weft-examples --example echo_bot`.

use weft::bot::BoundMessage;
use weft::rules::{HasText, RuleExt};
use weft::{Api, Bot, Dispatcher, Response, Settings, Token};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Pulls `.env` / XDG config into the environment, then the overrides.
    let settings = Settings::load();
    let token = Token::from_env(None).expect("BOT_TOKEN must be set");
    let api = Api::from_settings(token, &settings);

    let mut dispatcher = Dispatcher::new();
    dispatcher.message.on::<BoundMessage, (), _, _>(
        vec![HasText.arc()],
        |message, _ctx, _nodes| async move {
            let text = message.text().unwrap_or_default().to_string();
            Ok(Response::Text(text))
        },
    );

    Bot::with_settings(api, dispatcher, settings).run_polling().await;
}
