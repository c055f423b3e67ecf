//! # Weft
//!
//! A Telegram bot framework core: a long-polling update loop, a rule-gated
//! dispatcher with typed views, a dependency-injection node composer, and a
//! keyed conversational state machine (the waiter machine).
//!
//! ## Design principles
//!
//! - **Rules compose**: predicates over adapted updates combine with
//!   [`RuleExt::and`] / [`RuleExt::or`] / [`RuleExt::not`]; context changes
//!   commit only when the containing check succeeds.
//! - **Nodes are declared, not looked up**: handlers and rules state their
//!   dependencies as typed [`NodeSet`] tuples at registration time; the
//!   [`node::Composer`] builds them per update with PER_CALL, PER_EVENT and
//!   GLOBAL lifetimes.
//! - **Conversations are keyed**: the [`WaiterMachine`] parks a handler on a
//!   `(view, state key)` pair and routes later events with the same key back
//!   to it, with lifetimes, eviction and cooperative cancellation.
//! - **Results, not panics**: adapter, composition and transport failures
//!   are values; a failed rule is just `false`, a failed handler goes
//!   through its [`Catcher`].
//!
//! ## Main modules
//!
//! - [`types`]: the `Update` envelope and typed payloads.
//! - [`api`]: [`Token`], [`Api`], the response envelope and [`ApiError`].
//! - [`client`]: the transport seam ([`Client`], [`ReqwestClient`],
//!   [`MockClient`]).
//! - [`bot`]: bound events, views, dispatcher, polling, the [`Bot`] runner.
//! - [`rules`]: the rule algebra and the built-in rules library.
//! - [`node`]: the composition engine and the built-in node library.
//! - [`i18n`]: the translator seam and per-locale rule memoization.
//! - [`tools`]: catcher, lifespan, bounded map, state storage.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use weft::{Api, Bot, Dispatcher, Response, Settings, Token};
//! use weft::bot::BoundMessage;
//! use weft::rules::{RuleExt, Text};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::load();
//!     let token = Token::from_env(None).expect("BOT_TOKEN must be set");
//!     let api = Api::from_settings(token, &settings);
//!
//!     let mut dispatcher = Dispatcher::new();
//!     dispatcher.message.on::<BoundMessage, (), _, _>(
//!         vec![Text::new("/start").arc()],
//!         |_message, _ctx, _nodes| async move { Ok(Response::Text("Hi".into())) },
//!     );
//!
//!     Bot::with_settings(api, dispatcher, settings).run_polling().await;
//! }
//! ```

pub mod api;
pub mod bot;
pub mod client;
pub mod i18n;
pub mod node;
pub mod rules;
pub mod settings;
pub mod tools;
pub mod types;

pub use api::{Api, ApiError, InvalidTokenError, SendMessageParams, Token};
pub use bot::dispatch::waiter::{
    Hasher, HasherId, ShortState, WaitEntry, WaitOptions, WaiterError, WaiterKey, WaiterMachine,
};
pub use bot::dispatch::{
    check_rule, process_inner, Context, ContextValue, Dispatcher, FuncHandler, GlobalMiddleware,
    Handler, HandlerResult, Middleware, Response, ReturnManager, View, ViewId,
    CONTEXT_STORE_NODES_KEY,
};
pub use bot::{Bot, BoundMessage, BoundUpdate, Event, LongPolling};
pub use client::{Client, ClientError, Form, MockClient, ReqwestClient};
pub use i18n::{translate_rule, Translator};
pub use node::{ComposeError, Composer, Node, NodeCollection, NodeSet, NodeSpec, Scope};
pub use rules::{Rule, RuleExt};
pub use settings::Settings;
pub use tools::{Catcher, ErrorHandler, HandlerError, Lifespan, LimitedDict};
pub use types::{Update, UpdateType};

/// When running `cargo test -p weft`, initializes tracing from `RUST_LOG` so
/// that unit tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
