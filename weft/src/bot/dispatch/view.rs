//! Views: dispatch buckets for one update kind.
//!
//! A view owns auto rules (prepended to every handler registered through
//! it), the handler list, the middleware chain and an optional return
//! manager. State views additionally expose a per-event state key used by
//! the waiter machine to address suspended conversations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::api::Api;
use crate::bot::bound::{BoundUpdate, Event};
use crate::node::NodeSet;
use crate::rules::{ArcRule, CHAT_MEMBER_KINDS, MESSAGE_KINDS};
use crate::types::{Update, UpdateType};

use super::handler::{ArcHandler, FuncHandler, HandlerResult};
use super::middleware::ArcMiddleware;
use super::process::process_inner;
use super::return_manager::{
    CallbackQueryReturnManager, MessageReturnManager, ReturnManager,
};
use super::context::Context;

/// Stable identity of one view instance; the waiter machine keys its
/// storage and middleware installation by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

fn next_view_id() -> ViewId {
    ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
}

type StateKeyFn = fn(&Event) -> Option<i64>;

fn no_state_key(_event: &Event) -> Option<i64> {
    None
}

fn message_state_key(event: &Event) -> Option<i64> {
    event.as_message().map(|m| m.chat_id())
}

fn callback_state_key(event: &Event) -> Option<i64> {
    event
        .as_callback_query()
        .and_then(|q| q.chat_id().or(Some(q.query.from.id)))
}

fn sender_state_key(event: &Event) -> Option<i64> {
    event.from_id()
}

/// One dispatch bucket: kind gate, rules, handlers, middlewares, manager.
pub struct View {
    id: ViewId,
    kinds: &'static [UpdateType],
    sub_kind: Option<UpdateType>,
    is_raw: bool,
    auto_rules: Vec<ArcRule>,
    handlers: Vec<ArcHandler>,
    // Mutated at runtime by the waiter machine installing its middleware.
    middlewares: RwLock<Vec<ArcMiddleware>>,
    return_manager: Option<Arc<dyn ReturnManager>>,
    state_key: StateKeyFn,
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("kinds", &self.kinds)
            .field("sub_kind", &self.sub_kind)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl View {
    fn new(
        kinds: &'static [UpdateType],
        state_key: StateKeyFn,
        return_manager: Option<Arc<dyn ReturnManager>>,
    ) -> Self {
        Self {
            id: next_view_id(),
            kinds,
            sub_kind: None,
            is_raw: false,
            auto_rules: Vec::new(),
            handlers: Vec::new(),
            middlewares: RwLock::new(Vec::new()),
            return_manager,
            state_key,
        }
    }

    /// Any message-like update; state key is the chat id.
    pub fn message() -> Self {
        Self::new(
            MESSAGE_KINDS,
            message_state_key,
            Some(Arc::new(MessageReturnManager)),
        )
    }

    pub fn callback_query() -> Self {
        Self::new(
            &[UpdateType::CallbackQuery],
            callback_state_key,
            Some(Arc::new(CallbackQueryReturnManager)),
        )
    }

    pub fn inline_query() -> Self {
        Self::new(&[UpdateType::InlineQuery], sender_state_key, None)
    }

    pub fn chat_join_request() -> Self {
        Self::new(&[UpdateType::ChatJoinRequest], sender_state_key, None)
    }

    pub fn chat_member() -> Self {
        Self::new(CHAT_MEMBER_KINDS, no_state_key, None)
    }

    pub fn pre_checkout_query() -> Self {
        Self::new(&[UpdateType::PreCheckoutQuery], sender_state_key, None)
    }

    /// The catch-all view: checks true whenever it has work to do.
    pub fn raw_event() -> Self {
        let mut view = Self::new(UpdateType::all(), no_state_key, None);
        view.is_raw = true;
        view
    }

    /// Narrows a multi-kind view to one exact sub-kind (e.g. only
    /// `edited_message` within the message view).
    pub fn sub_kind(mut self, kind: UpdateType) -> Self {
        self.sub_kind = Some(kind);
        self
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Rule prepended to every handler registered after this call.
    pub fn auto_rule(&mut self, rule: ArcRule) -> &mut Self {
        self.auto_rules.push(rule);
        self
    }

    /// Registers a prepared handler.
    pub fn register(&mut self, handler: ArcHandler) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Registers a closure handler gated by `rules` (auto rules prepended).
    pub fn on<E, N, F, Fut>(&mut self, rules: Vec<ArcRule>, func: F) -> &mut Self
    where
        E: TryFrom<Event> + Send + Sync + 'static,
        N: NodeSet,
        F: Fn(E, Context, N) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        let mut all_rules = self.auto_rules.clone();
        all_rules.extend(rules);
        self.register(Arc::new(FuncHandler::<E, N>::new(all_rules, func)))
    }

    /// Same as [`View::on`] but the handler does not block later handlers.
    pub fn on_non_blocking<E, N, F, Fut>(&mut self, rules: Vec<ArcRule>, func: F) -> &mut Self
    where
        E: TryFrom<Event> + Send + Sync + 'static,
        N: NodeSet,
        F: Fn(E, Context, N) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        let mut all_rules = self.auto_rules.clone();
        all_rules.extend(rules);
        self.register(Arc::new(
            FuncHandler::<E, N>::new(all_rules, func).non_blocking(),
        ))
    }

    /// Appends a middleware to the chain.
    pub fn middleware(&self, middleware: ArcMiddleware) {
        self.middlewares
            .write()
            .expect("middleware list poisoned")
            .push(middleware);
    }

    /// Prepends a middleware; the waiter machine installs itself this way so
    /// it sees events before user middlewares.
    pub fn middleware_first(&self, middleware: ArcMiddleware) {
        self.middlewares
            .write()
            .expect("middleware list poisoned")
            .insert(0, middleware);
    }

    /// The waiter-machine state key for an event of this view.
    pub fn state_key(&self, event: &Event) -> Option<i64> {
        (self.state_key)(event)
    }

    pub(crate) fn state_key_fn(&self) -> StateKeyFn {
        self.state_key
    }

    /// Whether this view claims the update.
    pub fn check(&self, update: &Update) -> bool {
        if self.is_raw {
            return !self.handlers.is_empty()
                || !self
                    .middlewares
                    .read()
                    .expect("middleware list poisoned")
                    .is_empty();
        }
        let Some(kind) = update.kind() else {
            return false;
        };
        if !self.kinds.contains(&kind) {
            return false;
        }
        self.sub_kind.is_none() || self.sub_kind == Some(kind)
    }

    /// Runs the full pipeline; returns whether any handler matched.
    pub async fn process(&self, update: Arc<Update>, api: &Api) -> bool {
        let bound = BoundUpdate::new(update.clone(), api.clone());
        let event = if self.is_raw {
            Event::Raw(bound)
        } else {
            match bound.to_event() {
                Some(event) => event,
                None => return false,
            }
        };
        let middlewares = self
            .middlewares
            .read()
            .expect("middleware list poisoned")
            .clone();
        process_inner(
            api,
            event,
            update,
            &middlewares,
            &self.handlers,
            self.return_manager.as_deref(),
        )
        .await
    }

    /// Merges another view's registrations into this one, preserving order.
    pub fn load(&mut self, other: View) {
        self.auto_rules.extend(other.auto_rules);
        self.handlers.extend(other.handlers);
        let other_middlewares = other
            .middlewares
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.middlewares
            .write()
            .expect("middleware list poisoned")
            .extend(other_middlewares);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::bound::BoundMessage;
    use crate::bot::dispatch::return_manager::Response;
    use crate::rules::tests_support::{api, callback_update, message_update};
    use crate::rules::{RuleExt, Text};

    /// **Scenario**: The message view claims message updates and nothing else.
    #[test]
    fn message_view_check() {
        let view = View::message();
        assert!(view.check(&message_update("x")));
        assert!(!view.check(&callback_update("x")));
    }

    /// **Scenario**: A sub-kind gate narrows the message view.
    #[test]
    fn sub_kind_gate() {
        let view = View::message().sub_kind(UpdateType::EditedMessage);
        assert!(!view.check(&message_update("x")));
    }

    /// **Scenario**: The raw view claims updates only when it has work.
    #[test]
    fn raw_view_checks_for_work() {
        let mut view = View::raw_event();
        assert!(!view.check(&message_update("x")));
        view.on::<BoundUpdate, (), _, _>(vec![], |_u, _ctx, _n| async move {
            Ok(Response::Ignore)
        });
        assert!(view.check(&message_update("x")));
    }

    /// **Scenario**: Auto rules gate handlers registered afterwards.
    #[tokio::test]
    async fn auto_rules_prepend() {
        let mut view = View::message();
        view.auto_rule(Text::new("/only").arc());
        view.on::<BoundMessage, (), _, _>(vec![], |_m, _ctx, _n| async move {
            Ok(Response::Ignore)
        });
        let api = api();
        assert!(view.process(message_update("/only"), &api).await);
        assert!(!view.process(message_update("/other"), &api).await);
    }

    /// **Scenario**: State keys: chat id for messages, sender for callbacks.
    #[test]
    fn state_keys() {
        let api = api();
        let message_view = View::message();
        let update = message_update("x");
        let event = BoundUpdate::new(update, api.clone()).to_event().unwrap();
        assert_eq!(message_view.state_key(&event), Some(100));

        let callback_view = View::callback_query();
        let update = callback_update("d");
        let event = BoundUpdate::new(update, api).to_event().unwrap();
        assert_eq!(callback_view.state_key(&event), Some(100));
    }
}
