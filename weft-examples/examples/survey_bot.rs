//! A two-turn conversation with the waiter machine: `/ask` asks for a name
//! and waits (per chat) for the next text message in the same chat.

use weft::bot::{BoundMessage, Event};
use weft::rules::{HasText, RuleExt, Text};
use weft::tools::HandlerError;
use weft::{Api, Bot, Dispatcher, Response, Settings, Token, WaitOptions, WaiterMachine};

#[tokio::main]
async fn main() {
    let settings = Settings::load();
    let token = Token::from_env(None).expect("BOT_TOKEN must be set");
    let api = Api::from_settings(token, &settings);

    let machine = WaiterMachine::new();
    let mut dispatcher = Dispatcher::new();
    // Installing the middleware up front hands back a hasher the handler
    // closure can keep.
    let hasher = machine.attach(&dispatcher.message);

    let wait_machine = machine.clone();
    dispatcher.message.on::<BoundMessage, (), _, _>(
        vec![Text::new("/ask").arc()],
        move |message, _ctx, _nodes| {
            let machine = wait_machine.clone();
            let hasher = hasher.clone();
            async move {
                message.answer("What is your name?").await?;
                let (event, _ctx) = machine
                    .wait_hashed(
                        &hasher,
                        &Event::Message(message.clone()),
                        WaitOptions::new().release(HasText.arc()),
                    )
                    .await
                    .map_err(HandlerError::new)?;
                let name = event.text().unwrap_or("stranger").to_string();
                Ok(Response::Text(format!("got: {name}")))
            }
        },
    );

    Bot::with_settings(api, dispatcher, settings)
        .with_machine(machine)
        .run_polling()
        .await;
}
