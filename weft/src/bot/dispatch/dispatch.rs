//! The dispatcher: typed views in a fixed order plus the raw-event
//! catch-all.

use std::sync::Arc;

use tracing::debug;

use crate::api::Api;
use crate::bot::bound::BoundUpdate;
use crate::node::NodeSet;
use crate::rules::ArcRule;
use crate::types::Update;

use super::context::Context;
use super::handler::HandlerResult;
use super::view::View;

/// All views of one bot, tried in declaration order; `raw_event` always
/// runs after the typed views.
pub struct Dispatcher {
    pub callback_query: View,
    pub chat_join_request: View,
    pub chat_member: View,
    pub inline_query: View,
    pub message: View,
    pub pre_checkout_query: View,
    pub raw_event: View,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            callback_query: View::callback_query(),
            chat_join_request: View::chat_join_request(),
            chat_member: View::chat_member(),
            inline_query: View::inline_query(),
            message: View::message(),
            pre_checkout_query: View::pre_checkout_query(),
            raw_event: View::raw_event(),
        }
    }

    fn typed_views(&self) -> [&View; 6] {
        [
            &self.callback_query,
            &self.chat_join_request,
            &self.chat_member,
            &self.inline_query,
            &self.message,
            &self.pre_checkout_query,
        ]
    }

    /// Registers a handler on the raw-event view: it sees every update kind.
    pub fn handle<N, F, Fut>(&mut self, rules: Vec<ArcRule>, func: F) -> &mut Self
    where
        N: NodeSet,
        F: Fn(BoundUpdate, Context, N) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        self.raw_event.on::<BoundUpdate, N, F, Fut>(rules, func);
        self
    }

    /// Routes one update. The first typed view whose pipeline reports a
    /// blocking match stops the typed pass; the raw-event view runs
    /// regardless. Returns whether any handler matched.
    pub async fn feed(&self, update: Arc<Update>, api: &Api) -> bool {
        debug!(
            update_id = update.update_id,
            kind = update.kind().map(|k| k.name()),
            "processing update"
        );
        let mut found = false;
        for view in self.typed_views() {
            if view.check(&update) {
                debug!(view = ?view, "update matched view");
                if view.process(update.clone(), api).await {
                    found = true;
                    break;
                }
            }
        }
        if self.raw_event.check(&update) {
            found |= self.raw_event.process(update, api).await;
        }
        found
    }

    /// Merges another dispatcher's registrations view by view, preserving
    /// order, so separate modules can each contribute handlers.
    pub fn load(&mut self, other: Dispatcher) {
        self.callback_query.load(other.callback_query);
        self.chat_join_request.load(other.chat_join_request);
        self.chat_member.load(other.chat_member);
        self.inline_query.load(other.inline_query);
        self.message.load(other.message);
        self.pre_checkout_query.load(other.pre_checkout_query);
        self.raw_event.load(other.raw_event);
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::bound::BoundMessage;
    use crate::bot::dispatch::return_manager::Response;
    use crate::rules::tests_support::{api, message_update};
    use crate::rules::{RuleExt, Text};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// **Scenario**: Blocking short-circuit — with `/a`, only the first of
    /// two matching handlers runs.
    #[tokio::test]
    async fn blocking_short_circuit() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .message
            .on::<BoundMessage, (), _, _>(vec![Text::new("/a").arc()], |_m, _c, _n| async move {
                FIRST.fetch_add(1, Ordering::SeqCst);
                Ok(Response::Ignore)
            });
        dispatcher
            .message
            .on::<BoundMessage, (), _, _>(vec![], |_m, _c, _n| async move {
                SECOND.fetch_add(1, Ordering::SeqCst);
                Ok(Response::Ignore)
            });

        let api = api();
        assert!(dispatcher.feed(message_update("/a"), &api).await);
        assert_eq!(FIRST.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND.load(Ordering::SeqCst), 0, "blocked handler must not run");
    }

    /// **Scenario**: The raw-event view runs even when a typed view matched.
    #[tokio::test]
    async fn raw_event_always_runs() {
        static RAW: AtomicUsize = AtomicUsize::new(0);

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .message
            .on::<BoundMessage, (), _, _>(vec![], |_m, _c, _n| async move {
                Ok(Response::Ignore)
            });
        dispatcher.handle::<(), _, _>(vec![], |_u, _c, _n| async move {
            RAW.fetch_add(1, Ordering::SeqCst);
            Ok(Response::Ignore)
        });

        let api = api();
        assert!(dispatcher.feed(message_update("hello"), &api).await);
        assert_eq!(RAW.load(Ordering::SeqCst), 1);
    }

    /// **Scenario**: `load` merges handlers so a second module's handler
    /// answers too.
    #[tokio::test]
    async fn load_merges_views() {
        static MAIN: AtomicUsize = AtomicUsize::new(0);
        static EXTRA: AtomicUsize = AtomicUsize::new(0);

        let mut main = Dispatcher::new();
        main.message.on::<BoundMessage, (), _, _>(
            vec![Text::new("/main").arc()],
            |_m, _c, _n| async move {
                MAIN.fetch_add(1, Ordering::SeqCst);
                Ok(Response::Ignore)
            },
        );

        let mut extra = Dispatcher::new();
        extra.message.on::<BoundMessage, (), _, _>(
            vec![Text::new("/extra").arc()],
            |_m, _c, _n| async move {
                EXTRA.fetch_add(1, Ordering::SeqCst);
                Ok(Response::Ignore)
            },
        );

        main.load(extra);
        let api = api();
        assert!(main.feed(message_update("/extra"), &api).await);
        assert_eq!(EXTRA.load(Ordering::SeqCst), 1);
        assert!(main.feed(message_update("/main"), &api).await);
        assert_eq!(MAIN.load(Ordering::SeqCst), 1);
    }

    /// **Scenario**: An unmatched update reports false.
    #[tokio::test]
    async fn unmatched_returns_false() {
        let dispatcher = Dispatcher::new();
        let api = api();
        assert!(!dispatcher.feed(message_update("anything"), &api).await);
    }
}
