//! Hashers: how an incoming event is mapped to the key of a suspended
//! conversation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bot::bound::Event;
use crate::bot::dispatch::view::{View, ViewId};

/// Identity of a hasher; view hashers are stable per view, custom hashers
/// get a unique id per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HasherId {
    View(ViewId),
    Custom(u64),
}

static NEXT_CUSTOM_ID: AtomicU64 = AtomicU64::new(1);

/// Key a waiter is stored under within one hasher's bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WaiterKey {
    Int(i64),
    Str(String),
}

impl From<i64> for WaiterKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for WaiterKey {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for WaiterKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

use super::KeyFn;

type DataFn<D> = Arc<dyn Fn(&Event) -> Option<D> + Send + Sync>;
type HashFn<D> = Arc<dyn Fn(&D) -> Option<WaiterKey> + Send + Sync>;

/// Extracts the routing data from an event and hashes it to a waiter key.
#[derive(Clone)]
pub struct Hasher<D> {
    id: HasherId,
    view_id: ViewId,
    data_from_event: DataFn<D>,
    hash_from_data: HashFn<D>,
}

impl<D> std::fmt::Debug for Hasher<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher").field("id", &self.id).finish()
    }
}

impl<D> Hasher<D> {
    /// Custom hasher over `view`'s events with explicit extract and hash
    /// functions.
    pub fn custom(
        view: &View,
        data_from_event: impl Fn(&Event) -> Option<D> + Send + Sync + 'static,
        hash_from_data: impl Fn(&D) -> Option<WaiterKey> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: HasherId::Custom(NEXT_CUSTOM_ID.fetch_add(1, Ordering::Relaxed)),
            view_id: view.id(),
            data_from_event: Arc::new(data_from_event),
            hash_from_data: Arc::new(hash_from_data),
        }
    }

    pub fn id(&self) -> HasherId {
        self.id
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn data_from_event(&self, event: &Event) -> Option<D> {
        (self.data_from_event)(event)
    }

    pub fn hash_from_data(&self, data: &D) -> Option<WaiterKey> {
        (self.hash_from_data)(data)
    }

    /// `hash(extract(event))`: the key an incoming event addresses.
    pub fn key_for_event(&self, event: &Event) -> Option<WaiterKey> {
        self.data_from_event(event)
            .and_then(|data| self.hash_from_data(&data))
    }

    /// Type-erased key function for the middleware.
    pub(crate) fn key_fn(&self) -> KeyFn
    where
        D: 'static,
    {
        let data_from_event = self.data_from_event.clone();
        let hash_from_data = self.hash_from_data.clone();
        Arc::new(move |event| data_from_event(event).and_then(|data| hash_from_data(&data)))
    }
}

impl Hasher<Event> {
    /// The standard state-view hasher: data is the event itself, the key is
    /// the view's state key. Stable identity per view, so every `wait` on
    /// the same view shares one bucket.
    pub fn for_view(view: &View) -> Self {
        let state_key = view.state_key_fn();
        Self {
            id: HasherId::View(view.id()),
            view_id: view.id(),
            data_from_event: Arc::new(|event| Some(event.clone())),
            hash_from_data: Arc::new(move |event: &Event| state_key(event).map(WaiterKey::Int)),
        }
    }
}
