//! View middlewares: pre hooks that can short-circuit the pipeline, post
//! hooks that observe the collected responses.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::rules::{AdapterSpec, ArcRule};

use super::context::Context;
use super::process::check_rule;
use super::return_manager::Response;

/// Shared middleware handle as stored by a view.
pub type ArcMiddleware = Arc<dyn Middleware>;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// When set, `pre`/`post` receive this adaptation of the raw update
    /// instead of the view's event; adapter failure skips the middleware.
    fn adapter(&self) -> Option<AdapterSpec> {
        None
    }

    /// Runs before the handlers; returning `false` short-circuits the whole
    /// pipeline for this update.
    async fn pre(&self, _event: &Event, _ctx: &mut Context) -> bool {
        true
    }

    /// Runs after the handlers with every collected response.
    async fn post(&self, _event: &Event, _responses: &[Response], _ctx: &mut Context) {}
}

/// Gates an inner middleware behind a filter rule; installed on the
/// raw-event view this is the global pre/post hook point.
pub struct GlobalMiddleware {
    filter: Option<ArcRule>,
    inner: ArcMiddleware,
}

impl GlobalMiddleware {
    pub fn new(inner: ArcMiddleware) -> Self {
        Self {
            filter: None,
            inner,
        }
    }

    pub fn filtered(inner: ArcMiddleware, filter: ArcRule) -> Self {
        Self {
            filter: Some(filter),
            inner,
        }
    }

    async fn applies(&self, event: &Event, ctx: &mut Context) -> bool {
        match &self.filter {
            Some(filter) => {
                let update = ctx.raw_update();
                check_rule(event.api(), filter, &update, ctx).await
            }
            None => true,
        }
    }
}

#[async_trait]
impl Middleware for GlobalMiddleware {
    fn adapter(&self) -> Option<AdapterSpec> {
        self.inner.adapter()
    }

    async fn pre(&self, event: &Event, ctx: &mut Context) -> bool {
        if !self.applies(event, ctx).await {
            return true;
        }
        self.inner.pre(event, ctx).await
    }

    async fn post(&self, event: &Event, responses: &[Response], ctx: &mut Context) {
        if self.applies(event, ctx).await {
            self.inner.post(event, responses, ctx).await;
        }
    }
}
