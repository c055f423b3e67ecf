//! The two inner algorithms of dispatch: checking one rule against one
//! update, and running one view's pipeline.

use std::sync::Arc;

use tracing::debug;

use crate::api::Api;
use crate::bot::bound::{BoundUpdate, Event};
use crate::i18n::translate_rule;
use crate::node::{compose_nodes, node_store, NodeCollection};
use crate::rules::ArcRule;
use crate::types::Update;

use super::context::{Context, CACHED_BOUND_UPDATE_KEY};
use super::handler::ArcHandler;
use super::middleware::ArcMiddleware;
use super::return_manager::{Response, ReturnManager};

/// Checks one rule: adapter, requirements, translation, node composition,
/// then the predicate itself. Failures at any stage mean "does not apply".
pub async fn check_rule(api: &Api, rule: &ArcRule, update: &Arc<Update>, ctx: &mut Context) -> bool {
    // 1. Adapt the update to the rule's expected event shape.
    let adapted = match rule.adapter().adapt(api, update) {
        Ok(event) => event,
        Err(error) => {
            debug!(error = %error, "adapter failed");
            return false;
        }
    };

    // 2. Normalize the bound update, reusing the cached one when present.
    let bound = match ctx.get::<BoundUpdate>(CACHED_BOUND_UPDATE_KEY) {
        Some(bound) => (*bound).clone(),
        None => {
            let bound = BoundUpdate::new(update.clone(), api.clone());
            ctx.set(CACHED_BOUND_UPDATE_KEY, bound.clone());
            bound
        }
    };

    // 3. Requirements run against a scratch context, merged only on success.
    let mut scratch = ctx.copy();
    for requirement in rule.requires() {
        if !Box::pin(check_rule(api, &requirement, update, &mut scratch)).await {
            return false;
        }
    }

    // 4. With a translator installed, check the translated rule from here on.
    let rule: ArcRule = match ctx.translator() {
        Some(translator) => translate_rule(rule, translator.as_ref()),
        None => rule.clone(),
    };

    // 5. Commit the requirements' context additions.
    ctx.merge(scratch);

    // 6. Compose the rule's required nodes.
    let specs = rule.node_specs();
    let mut nodes = if specs.is_empty() {
        NodeCollection::empty()
    } else {
        match compose_nodes(&specs, ctx, api, update, &bound).await {
            Ok(collection) => collection,
            Err(error) => {
                debug!(error = %error, "rule node composition failed");
                return false;
            }
        }
    };

    // 7–8. Run the predicate, then close any per-call node sessions.
    let result = rule.check(&adapted, ctx, &nodes).await;
    nodes.close_all();
    result
}

/// Runs one view's pipeline for one update. Returns whether any handler
/// matched.
pub async fn process_inner(
    api: &Api,
    event: Event,
    raw_update: Arc<Update>,
    middlewares: &[ArcMiddleware],
    handlers: &[ArcHandler],
    return_manager: Option<&dyn ReturnManager>,
) -> bool {
    let mut ctx = Context::new(raw_update.clone());
    // Install the per-event node store before anything can compose.
    let store = node_store(&mut ctx);

    debug!("running pre middlewares");
    for middleware in middlewares {
        let adapted;
        let seen_event = match middleware.adapter() {
            Some(adapter) => match adapter.adapt(api, &raw_update) {
                Ok(event) => {
                    adapted = event;
                    &adapted
                }
                // The middleware does not apply to this update kind.
                Err(_) => continue,
            },
            None => &event,
        };
        if !middleware.pre(seen_event, &mut ctx).await {
            debug!("pre middleware short-circuited the pipeline");
            store.close();
            return false;
        }
    }

    let mut found = false;
    let mut responses: Vec<Response> = Vec::new();

    for handler in handlers {
        // Each handler checks against its own copy; a failed or non-blocking
        // handler leaves the pipeline context untouched.
        let mut handler_ctx = ctx.copy();
        if handler.check(api, &raw_update, &mut handler_ctx).await {
            debug!("handler matched, running");
            found = true;
            match handler.run(&event, &mut handler_ctx).await {
                Ok(response) => {
                    if let Some(manager) = return_manager {
                        manager.run(&response, &event, &mut handler_ctx).await;
                    }
                    responses.push(response);
                }
                Err(error) => {
                    tracing::error!(error = %error, "handler failed");
                }
            }
            if handler.is_blocking() {
                // A blocking match ends the view with its context kept, so
                // the post middlewares observe the handler's bindings.
                ctx.merge(handler_ctx);
                break;
            }
        }
    }

    debug!("running post middlewares");
    for middleware in middlewares {
        let adapted;
        let seen_event = match middleware.adapter() {
            Some(adapter) => match adapter.adapt(api, &raw_update) {
                Ok(event) => {
                    adapted = event;
                    &adapted
                }
                Err(_) => continue,
            },
            None => &event,
        };
        middleware.post(seen_event, &responses, &mut ctx).await;
    }

    // End of event: close the PER_EVENT node sessions.
    store.close();

    debug!(found, "view pipeline finished");
    found
}
