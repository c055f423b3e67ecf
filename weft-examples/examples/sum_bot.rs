//! Command arguments: `/sum 2 3` answers `5`.
//!
//! The `Command` rule validates both tokens and binds them into the
//! context under their argument names.

use weft::bot::BoundMessage;
use weft::rules::{Argument, Command, RuleExt};
use weft::{Api, Bot, Dispatcher, Response, Settings, Token};

#[tokio::main]
async fn main() {
    let settings = Settings::load();
    let token = Token::from_env(None).expect("BOT_TOKEN must be set");
    let api = Api::from_settings(token, &settings);

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

    Bot::with_settings(api, dispatcher, settings).run_polling().await;
}
