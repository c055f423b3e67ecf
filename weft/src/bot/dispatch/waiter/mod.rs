//! The waiter machine: a keyed registry of suspended conversations.
//!
//! `wait()` parks the calling handler on a completion signal stored under
//! `(hasher, key)`; the machine's middleware routes later events with the
//! same key back to it. Each hasher's bucket is a [`LimitedDict`]: at most
//! one waiter per key, oldest-evicted at capacity, eviction cancels the
//! displaced waiter.

mod hasher;
mod middleware;
mod short_state;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::handler::ArcHandler;
use crate::bot::dispatch::view::{View, ViewId};
use crate::rules::ArcRule;
pub use crate::tools::limited_dict::LimitedDict;

pub use hasher::{Hasher, HasherId, WaiterKey};
pub use middleware::WaiterMiddleware;
pub use short_state::{Captured, OnDrop, ShortState, WaiterActions};

/// Default waiter lifetime: one week.
pub const DEFAULT_STATE_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default per-hasher storage capacity.
pub const DEFAULT_MAX_STORAGE_SIZE: usize = 1000;

pub(crate) type KeyFn = Arc<dyn Fn(&Event) -> Option<WaiterKey> + Send + Sync>;

type Bucket = Mutex<LimitedDict<WaiterKey, Arc<ShortState>>>;

/// Waiter operation failures. Lookup failures are programming errors
/// surfaced to the caller; cancellation means "conversation aborted".
#[derive(Debug, Error)]
pub enum WaiterError {
    #[error("no record of hasher {0:?}")]
    UnknownHasher(HasherId),

    #[error("no waiter stored under {0:?}")]
    UnknownKey(WaiterKey),

    #[error("hasher produced no key for the given data")]
    NoKey,

    #[error("waiter was cancelled")]
    Cancelled,
}

/// Everything a `wait` call can configure.
#[derive(Clone, Default)]
pub struct WaitOptions {
    filter: Option<ArcRule>,
    release: Option<ArcRule>,
    lifetime: Option<Duration>,
    actions: WaiterActions,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events failing the filter are left to the ordinary handlers instead
    /// of being consumed by the waiter.
    pub fn filter(mut self, rule: ArcRule) -> Self {
        self.filter = Some(rule);
        self
    }

    /// The waiter resumes only when this rule passes; without one, the next
    /// keyed event releases it.
    pub fn release(mut self, rule: ArcRule) -> Self {
        self.release = Some(rule);
        self
    }

    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Handler run when a consumed event misses the release rule.
    pub fn on_miss(mut self, handler: ArcHandler) -> Self {
        self.actions.on_miss = Some(handler);
        self
    }

    /// Invoked at most once when the waiter is dropped or expires.
    pub fn on_drop(mut self, action: OnDrop) -> Self {
        self.actions.on_drop = Some(action);
        self
    }
}

/// One `(hasher, data)` registration of a `wait_many` call.
pub struct WaitEntry<'a> {
    view: &'a View,
    hasher_id: HasherId,
    key_fn: KeyFn,
    key: WaiterKey,
}

impl<'a> WaitEntry<'a> {
    pub fn new<D: 'static>(view: &'a View, hasher: &Hasher<D>, data: &D) -> Result<Self, WaiterError> {
        let key = hasher.hash_from_data(data).ok_or(WaiterError::NoKey)?;
        Ok(Self {
            view,
            hasher_id: hasher.id(),
            key_fn: hasher.key_fn(),
            key,
        })
    }

    /// The view's own state hasher applied to an event.
    pub fn from_event(view: &'a View, event: &Event) -> Result<Self, WaiterError> {
        let hasher = Hasher::for_view(view);
        Self::new(view, &hasher, event)
    }
}

struct Registration<'a> {
    view: Option<&'a View>,
    hasher_id: HasherId,
    key_fn: KeyFn,
    key: WaiterKey,
}

pub(crate) struct MachineInner {
    max_storage_size: usize,
    base_lifetime: Duration,
    storage: DashMap<HasherId, Bucket>,
    installed: DashMap<(ViewId, HasherId), ()>,
}

impl MachineInner {
    fn bucket_set(
        &self,
        hasher_id: HasherId,
        key: WaiterKey,
        state: Arc<ShortState>,
    ) -> Option<Arc<ShortState>> {
        let bucket = self
            .storage
            .entry(hasher_id)
            .or_insert_with(|| Mutex::new(LimitedDict::new(self.max_storage_size)));
        let result = bucket.lock().expect("waiter bucket poisoned").set(key, state);
        result
    }

    /// Removes the state only while it is still the stored one.
    fn bucket_pop_if(&self, hasher_id: HasherId, key: &WaiterKey, state: &Arc<ShortState>) {
        if let Some(bucket) = self.storage.get(&hasher_id) {
            let mut bucket = bucket.lock().expect("waiter bucket poisoned");
            if bucket.get(key).map(|s| Arc::ptr_eq(s, state)).unwrap_or(false) {
                bucket.pop(key);
            }
        }
    }

    /// Removes, runs on-drop and cancels whatever is stored under the key.
    pub(crate) fn drop_state(&self, hasher_id: HasherId, key: &WaiterKey) {
        let state = self
            .storage
            .get(&hasher_id)
            .and_then(|bucket| bucket.lock().expect("waiter bucket poisoned").pop(key));
        if let Some(state) = state {
            state.run_on_drop();
            state.cancel();
        }
    }
}

/// The registry of suspended conversations; cheap to clone and share.
#[derive(Clone)]
pub struct WaiterMachine {
    inner: Arc<MachineInner>,
}

impl Default for WaiterMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WaiterMachine {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_MAX_STORAGE_SIZE, DEFAULT_STATE_LIFETIME)
    }

    /// `max_storage_size` waiters per hasher, `base_state_lifetime` default
    /// deadline.
    pub fn with_settings(max_storage_size: usize, base_state_lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(MachineInner {
                max_storage_size,
                base_lifetime: base_state_lifetime,
                storage: DashMap::new(),
                installed: DashMap::new(),
            }),
        }
    }

    fn ensure_middleware(&self, view: &View, hasher_id: HasherId, key_fn: KeyFn) {
        let marker = (view.id(), hasher_id);
        if self.inner.installed.insert(marker, ()).is_none() {
            view.middleware_first(Arc::new(WaiterMiddleware::new(
                &self.inner,
                hasher_id,
                key_fn,
            )));
        }
    }

    /// Installs the view's waiter middleware (once) and hands back the
    /// view's state hasher, ready for [`WaiterMachine::wait_hashed`] from
    /// inside handler closures.
    pub fn attach(&self, view: &View) -> Hasher<Event> {
        let hasher = Hasher::for_view(view);
        self.ensure_middleware(view, hasher.id(), hasher.key_fn());
        hasher
    }

    /// Suspends the caller until an event with `view`'s state key of `event`
    /// arrives and the release rule passes.
    pub async fn wait_from_event(
        &self,
        view: &View,
        event: &Event,
        options: WaitOptions,
    ) -> Result<(Event, Context), WaiterError> {
        let hasher = Hasher::for_view(view);
        self.wait(view, &hasher, event, options).await
    }

    /// Suspends the caller under `hasher.hash(data)`.
    pub async fn wait<D: 'static>(
        &self,
        view: &View,
        hasher: &Hasher<D>,
        data: &D,
        options: WaitOptions,
    ) -> Result<(Event, Context), WaiterError> {
        let key = hasher.hash_from_data(data).ok_or(WaiterError::NoKey)?;
        let (captured, _) = self
            .wait_keyed(
                &[Registration {
                    view: Some(view),
                    hasher_id: hasher.id(),
                    key_fn: hasher.key_fn(),
                    key,
                }],
                options,
            )
            .await?;
        Ok(captured)
    }

    /// Like [`WaiterMachine::wait`] for a hasher previously attached with
    /// [`WaiterMachine::attach`]; no view handle needed at the call site.
    pub async fn wait_hashed<D: 'static>(
        &self,
        hasher: &Hasher<D>,
        data: &D,
        options: WaitOptions,
    ) -> Result<(Event, Context), WaiterError> {
        let key = hasher.hash_from_data(data).ok_or(WaiterError::NoKey)?;
        let (captured, _) = self
            .wait_keyed(
                &[Registration {
                    view: None,
                    hasher_id: hasher.id(),
                    key_fn: hasher.key_fn(),
                    key,
                }],
                options,
            )
            .await?;
        Ok(captured)
    }

    /// Registers one waiter under several hashers; the first completion
    /// wins. Returns which hasher fired along with the captured context.
    pub async fn wait_many(
        &self,
        entries: Vec<WaitEntry<'_>>,
        options: WaitOptions,
    ) -> Result<(HasherId, Event, Context), WaiterError> {
        let registrations: Vec<Registration<'_>> = entries
            .iter()
            .map(|e| Registration {
                view: Some(e.view),
                hasher_id: e.hasher_id,
                key_fn: e.key_fn.clone(),
                key: e.key.clone(),
            })
            .collect();
        let ((event, ctx), initiator) = self.wait_keyed(&registrations, options).await?;
        Ok((initiator, event, ctx))
    }

    async fn wait_keyed(
        &self,
        registrations: &[Registration<'_>],
        options: WaitOptions,
    ) -> Result<((Event, Context), HasherId), WaiterError> {
        let (sender, receiver) = oneshot::channel();
        let lifetime = options.lifetime.unwrap_or(self.inner.base_lifetime);
        let state = Arc::new(ShortState::new(
            sender,
            options.filter,
            options.release,
            options.actions,
            lifetime,
        ));

        for registration in registrations {
            if let Some(view) = registration.view {
                self.ensure_middleware(view, registration.hasher_id, registration.key_fn.clone());
            }
            // Setting evicts and cancels any predecessor under the same key,
            // and the oldest waiter when the bucket is full.
            if let Some(displaced) = self.inner.bucket_set(
                registration.hasher_id,
                registration.key.clone(),
                state.clone(),
            ) {
                displaced.cancel();
            }
        }

        let outcome = receiver.await;

        match outcome {
            Ok(captured) => {
                for registration in registrations {
                    self.inner
                        .bucket_pop_if(registration.hasher_id, &registration.key, &state);
                }
                Ok(((captured.event, captured.ctx), captured.hasher))
            }
            // The sender was dropped: evicted, dropped or machine shutdown.
            Err(_) => Err(WaiterError::Cancelled),
        }
    }

    /// Removes and cancels the waiter stored under `hasher.hash(data)`,
    /// running its on-drop action. Unknown hashers and keys are programming
    /// errors and surface as such.
    pub fn drop_waiter<D>(&self, hasher: &Hasher<D>, data: &D) -> Result<(), WaiterError> {
        let key = hasher.hash_from_data(data).ok_or(WaiterError::NoKey)?;
        let bucket = self
            .inner
            .storage
            .get(&hasher.id())
            .ok_or(WaiterError::UnknownHasher(hasher.id()))?;
        let state = bucket
            .lock()
            .expect("waiter bucket poisoned")
            .pop(&key)
            .ok_or(WaiterError::UnknownKey(key))?;
        drop(bucket);
        state.run_on_drop();
        state.cancel();
        Ok(())
    }

    /// Sweeps expired waiters out of every bucket, running their on-drop
    /// actions (at most once per waiter).
    pub fn clear_storage(&self) {
        let now = Utc::now();
        for bucket in self.inner.storage.iter() {
            let expired: Vec<(WaiterKey, Arc<ShortState>)> = {
                let mut locked = bucket.lock().expect("waiter bucket poisoned");
                let keys: Vec<WaiterKey> = locked
                    .iter()
                    .filter(|(_, state)| state.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect();
                keys.into_iter()
                    .filter_map(|key| locked.pop(&key).map(|state| (key, state)))
                    .collect()
            };
            for (_, state) in expired {
                state.run_on_drop();
                state.cancel();
            }
        }
    }

    /// Cancels every waiter and empties the storage.
    pub fn drop_all(&self) {
        for bucket in self.inner.storage.iter() {
            let drained = bucket.lock().expect("waiter bucket poisoned").drain();
            for (_, state) in drained {
                state.cancel();
            }
        }
        self.inner.storage.clear();
    }

    /// Number of waiters currently stored for a hasher (diagnostics/tests).
    pub fn stored(&self, hasher_id: HasherId) -> usize {
        self.inner
            .storage
            .get(&hasher_id)
            .map(|bucket| bucket.lock().expect("waiter bucket poisoned").len())
            .unwrap_or(0)
    }
}
