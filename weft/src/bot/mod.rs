//! The bot runtime: bound event types, dispatch, polling and the
//! supervisor.

pub mod bound;
pub mod dispatch;
pub mod polling;
pub mod runner;

pub use bound::{
    BoundCallbackQuery, BoundChatJoinRequest, BoundChatMemberUpdated, BoundInlineQuery,
    BoundMessage, BoundPreCheckoutQuery, BoundUpdate, Event,
};
pub use dispatch::Dispatcher;
pub use polling::LongPolling;
pub use runner::Bot;
