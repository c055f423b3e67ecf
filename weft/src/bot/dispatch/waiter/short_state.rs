//! One suspended conversation: completion signal, gating rules, lifetime
//! and the actions to run when it is missed or dropped.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::handler::ArcHandler;
use crate::rules::ArcRule;

use super::hasher::HasherId;

/// What a resolved waiter hands back to the suspended caller.
#[derive(Clone, Debug)]
pub struct Captured {
    /// Which hasher fired (the "initiator"; meaningful for `wait_many`).
    pub hasher: HasherId,
    pub event: Event,
    pub ctx: Context,
}

/// Callback invoked when a waiter is dropped (evicted, expired or removed).
pub type OnDrop = Arc<dyn Fn(&ShortState) + Send + Sync>;

/// Optional reactions attached to a waiter.
#[derive(Clone, Default)]
pub struct WaiterActions {
    /// Handler run when an owned event fails the release rule.
    pub on_miss: Option<ArcHandler>,
    /// Invoked at most once when the waiter is dropped.
    pub on_drop: Option<OnDrop>,
}

/// A single suspended conversation waiting for a matching event.
pub struct ShortState {
    signal: Mutex<Option<oneshot::Sender<Captured>>>,
    pub filter: Option<ArcRule>,
    pub release: Option<ArcRule>,
    pub actions: WaiterActions,
    pub expiration_date: DateTime<Utc>,
}

impl std::fmt::Debug for ShortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortState")
            .field("expiration_date", &self.expiration_date)
            .field("resolved", &self.signal.lock().map(|s| s.is_none()).unwrap_or(true))
            .finish()
    }
}

impl ShortState {
    pub fn new(
        sender: oneshot::Sender<Captured>,
        filter: Option<ArcRule>,
        release: Option<ArcRule>,
        actions: WaiterActions,
        lifetime: std::time::Duration,
    ) -> Self {
        let lifetime = chrono::Duration::from_std(lifetime)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        Self {
            signal: Mutex::new(Some(sender)),
            filter,
            release,
            actions,
            expiration_date: Utc::now() + lifetime,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date
    }

    /// Wakes the suspended caller with the captured event and context.
    /// Returns false when the state was already resolved or cancelled.
    pub fn resolve(&self, captured: Captured) -> bool {
        let Some(sender) = self.signal.lock().expect("short state poisoned").take() else {
            return false;
        };
        sender.send(captured).is_ok()
    }

    /// Wakes the suspended caller with a cancellation: the conversation is
    /// aborted and no context is returned.
    pub fn cancel(&self) {
        // Dropping the sender closes the channel; the waiter observes it as
        // a cancellation, never as a captured context.
        drop(self.signal.lock().expect("short state poisoned").take());
    }

    /// Runs the on-drop action (at most once per state, guarded by the
    /// caller removing the state from storage first).
    pub fn run_on_drop(&self) {
        if let Some(on_drop) = &self.actions.on_drop {
            on_drop(self);
        }
    }
}
