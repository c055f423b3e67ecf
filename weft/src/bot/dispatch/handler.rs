//! Handlers: rule-gated callables with node-composed arguments.
//!
//! [`FuncHandler`] is the workhorse: a closure over `(event, context,
//! nodes)` guarded by rules, with an optional update-kind gate, a preset
//! context, and an error handler. The node tuple is declared at
//! registration time ([`NodeSet`]), which gives the dispatcher a static
//! table of what to compose before invocation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::api::Api;
use crate::bot::bound::{BoundUpdate, Event};
use crate::node::{compose_nodes, NodeSet};
use crate::rules::ArcRule;
use crate::tools::error_handler::{ErrorHandler, HandlerError};
use crate::types::{Update, UpdateType};

use super::context::{Context, ContextValue, CACHED_BOUND_UPDATE_KEY};
use super::process::check_rule;
use super::return_manager::Response;

/// What a handler invocation produces.
pub type HandlerResult = Result<Response, HandlerError>;

/// Shared handler handle as stored by a view.
pub type ArcHandler = Arc<dyn Handler>;

/// A rule-gated callable in a view's pipeline.
#[async_trait]
pub trait Handler: Send + Sync {
    /// A matching blocking handler ends the view for this update.
    fn is_blocking(&self) -> bool;

    /// Evaluates the handler's gates and rules against (a copy of) the
    /// pipeline context; bindings from matching rules land in `ctx`.
    async fn check(&self, api: &Api, update: &Arc<Update>, ctx: &mut Context) -> bool;

    /// Invokes the handler with the view's event and the post-rule context.
    async fn run(&self, event: &Event, ctx: &mut Context) -> HandlerResult;
}

type BoxedHandlerFn<E, N> =
    Arc<dyn Fn(E, Context, N) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Closure handler over a typed event `E` and a node tuple `N`.
pub struct FuncHandler<E, N>
where
    E: TryFrom<Event> + Send + Sync + 'static,
    N: NodeSet,
{
    rules: Vec<ArcRule>,
    is_blocking: bool,
    update_type: Option<UpdateType>,
    preset: Vec<(String, ContextValue)>,
    error_handler: ErrorHandler,
    func: BoxedHandlerFn<E, N>,
}

impl<E, N> FuncHandler<E, N>
where
    E: TryFrom<Event> + Send + Sync + 'static,
    N: NodeSet,
{
    pub fn new<F, Fut>(rules: Vec<ArcRule>, func: F) -> Self
    where
        F: Fn(E, Context, N) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            rules,
            is_blocking: true,
            update_type: None,
            preset: Vec::new(),
            error_handler: ErrorHandler::new(),
            func: Arc::new(move |event, ctx, nodes| Box::pin(func(event, ctx, nodes))),
        }
    }

    /// Non-blocking handlers let later handlers in the view run too.
    pub fn non_blocking(mut self) -> Self {
        self.is_blocking = false;
        self
    }

    /// Gates the handler on one exact update kind.
    pub fn update_type(mut self, kind: UpdateType) -> Self {
        self.update_type = Some(kind);
        self
    }

    /// Preset context entry, installed before the rules run and kept only
    /// when the check succeeds.
    pub fn preset<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.preset.push((key.into(), Arc::new(value)));
        self
    }

    pub fn error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = error_handler;
        self
    }
}

#[async_trait]
impl<E, N> Handler for FuncHandler<E, N>
where
    E: TryFrom<Event> + Send + Sync + 'static,
    N: NodeSet,
{
    fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    async fn check(&self, api: &Api, update: &Arc<Update>, ctx: &mut Context) -> bool {
        if let Some(gate) = self.update_type {
            if update.kind() != Some(gate) {
                return false;
            }
        }
        for (key, value) in &self.preset {
            ctx.set_arc(key.clone(), value.clone());
        }
        for rule in &self.rules {
            if !check_rule(api, rule, update, ctx).await {
                tracing::debug!("handler rule failed, skipping handler");
                return false;
            }
        }
        true
    }

    async fn run(&self, event: &Event, ctx: &mut Context) -> HandlerResult {
        let result = self.invoke(event, ctx).await;
        self.error_handler.run(result, event, ctx).await
    }
}

impl<E, N> FuncHandler<E, N>
where
    E: TryFrom<Event> + Send + Sync + 'static,
    N: NodeSet,
{
    async fn invoke(&self, event: &Event, ctx: &mut Context) -> HandlerResult {
        let typed = E::try_from(event.clone())
            .map_err(|_| HandlerError::msg("event does not adapt to the handler's type"))?;

        let specs = N::specs();
        let mut collection = if specs.is_empty() {
            crate::node::NodeCollection::empty()
        } else {
            let api = event.api().clone();
            let update = ctx.raw_update();
            let bound = match ctx.get::<BoundUpdate>(CACHED_BOUND_UPDATE_KEY) {
                Some(bound) => (*bound).clone(),
                None => BoundUpdate::new(update.clone(), api.clone()),
            };
            compose_nodes(&specs, ctx, &api, &update, &bound).await?
        };
        let nodes = N::extract(&collection)?;

        let result = (self.func)(typed, ctx.copy(), nodes).await;
        collection.close_all();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::bound::BoundMessage;
    use crate::node::Text;
    use crate::rules::tests_support::{api, message_update};
    use crate::rules::{RuleExt, Text as TextRule};

    fn event_for(update: &Arc<Update>, api: &Api) -> Event {
        BoundUpdate::new(update.clone(), api.clone())
            .to_event()
            .unwrap()
    }

    /// **Scenario**: Rules gate the handler; matching binds nothing extra here.
    #[tokio::test]
    async fn check_gates_on_rules() {
        let handler: FuncHandler<BoundMessage, ()> =
            FuncHandler::new(vec![TextRule::new("/go").arc()], |_m, _ctx, _n| async move {
                Ok(Response::Ignore)
            });
        let api = api();
        let update = message_update("/go");
        let mut ctx = Context::new(update.clone());
        assert!(handler.check(&api, &update, &mut ctx).await);

        let update = message_update("/stop");
        let mut ctx = Context::new(update.clone());
        assert!(!handler.check(&api, &update, &mut ctx).await);
    }

    /// **Scenario**: Declared nodes are composed and handed to the closure.
    #[tokio::test]
    async fn nodes_reach_the_closure() {
        let handler: FuncHandler<BoundMessage, (Arc<Text>,)> =
            FuncHandler::new(vec![], |_m, _ctx, (text,): (Arc<Text>,)| async move {
                Ok(Response::Text(format!("got: {}", &**text)))
            });
        let api = api();
        let update = message_update("answer");
        let mut ctx = Context::new(update.clone());
        let event = event_for(&update, &api);
        let response = handler.run(&event, &mut ctx).await.unwrap();
        assert_eq!(response, Response::Text("got: answer".into()));
    }

    /// **Scenario**: A failing node composition surfaces as a handler error.
    #[tokio::test]
    async fn compose_failure_is_handler_error() {
        let handler: FuncHandler<BoundMessage, (Arc<crate::node::TextInteger>,)> =
            FuncHandler::new(vec![], |_m, _ctx, _n| async move { Ok(Response::Ignore) });
        let api = api();
        let update = message_update("not numeric");
        let mut ctx = Context::new(update.clone());
        let event = event_for(&update, &api);
        let err = handler.run(&event, &mut ctx).await.unwrap_err();
        assert!(err.is::<crate::node::ComposeError>(), "{err}");
    }

    /// **Scenario**: Preset entries are visible to the rules during check.
    #[tokio::test]
    async fn preset_visible_to_rules() {
        use crate::rules::FuncRule;
        let sees_preset = FuncRule::new(|_event, ctx: &mut Context| {
            ctx.get::<i64>("preset_flag").map(|v| *v == 1).unwrap_or(false)
        })
        .arc();
        let handler: FuncHandler<BoundMessage, ()> =
            FuncHandler::new(vec![sees_preset], |_m, _ctx, _n| async move {
                Ok(Response::Ignore)
            })
            .preset("preset_flag", 1i64);
        let api = api();
        let update = message_update("x");
        let mut ctx = Context::new(update.clone());
        assert!(handler.check(&api, &update, &mut ctx).await);
    }
}
