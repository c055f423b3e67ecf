//! The waiter machine's view middleware: routes incoming events to the
//! suspended conversation that owns their state key.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::middleware::Middleware;
use crate::bot::dispatch::process::check_rule;

use super::hasher::HasherId;
use super::short_state::Captured;
use super::{KeyFn, MachineInner};

/// Installed once per (view, hasher) on first use; holds the machine by a
/// weak handle so the middleware chain never keeps it alive.
pub struct WaiterMiddleware {
    pub(super) machine: Weak<MachineInner>,
    pub(super) hasher_id: HasherId,
    pub(super) key_fn: KeyFn,
}

#[async_trait]
impl Middleware for WaiterMiddleware {
    async fn pre(&self, event: &Event, ctx: &mut Context) -> bool {
        let Some(machine) = self.machine.upgrade() else {
            return true;
        };
        let Some(key) = (self.key_fn)(event) else {
            // No state key: the event is not addressable, let handlers run.
            return true;
        };

        let state = match machine.storage.get(&self.hasher_id) {
            Some(bucket) => bucket
                .lock()
                .expect("waiter bucket poisoned")
                .get(&key)
                .cloned(),
            None => None,
        };
        let Some(state) = state else {
            return true;
        };

        if state.is_expired(Utc::now()) {
            machine.drop_state(self.hasher_id, &key);
            return true;
        }

        let api = event.api().clone();
        let update = ctx.raw_update();

        // A failing filter leaves the event to the ordinary handlers.
        if let Some(filter) = &state.filter {
            let mut scratch = ctx.copy();
            if !check_rule(&api, filter, &update, &mut scratch).await {
                return true;
            }
        }

        // The release rule runs like the single rule of a synthetic handler:
        // its context bindings are captured alongside the event.
        let release_ctx = match &state.release {
            Some(release) => {
                let mut release_ctx = ctx.copy();
                if check_rule(&api, release, &update, &mut release_ctx).await {
                    Some(release_ctx)
                } else {
                    None
                }
            }
            None => Some(ctx.copy()),
        };

        match release_ctx {
            Some(captured_ctx) => {
                state.resolve(Captured {
                    hasher: self.hasher_id,
                    event: event.clone(),
                    ctx: captured_ctx,
                });
            }
            None => {
                if let Some(on_miss) = &state.actions.on_miss {
                    let mut miss_ctx = ctx.copy();
                    if on_miss.check(&api, &update, &mut miss_ctx).await {
                        if let Err(error) = on_miss.run(event, &mut miss_ctx).await {
                            tracing::error!(error = %error, "waiter on_miss handler failed");
                        }
                    }
                }
            }
        }

        // The waiter owns this conversation key until released or dropped.
        false
    }
}

impl WaiterMiddleware {
    pub(super) fn new(machine: &Arc<MachineInner>, hasher_id: HasherId, key_fn: KeyFn) -> Self {
        Self {
            machine: Arc::downgrade(machine),
            hasher_id,
            key_fn,
        }
    }
}
