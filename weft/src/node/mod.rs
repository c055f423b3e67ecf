//! Node composition: dependency-injected typed values built on demand per
//! update.
//!
//! A node is a type with a `compose` constructor; its dependencies are other
//! nodes resolved through the [`Composer`], plus the capability seeds (API
//! handle, raw update, bound update, context snapshot). Three lifetimes:
//! PER_CALL values live for one resolution, PER_EVENT values are cached in
//! the update's context store, GLOBAL values are process-wide singletons.
//!
//! Cycles in node dependencies are a programming error and are detected via
//! the resolution stack.

mod library;
mod poly;
mod set;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::api::Api;
use crate::bot::bound::BoundUpdate;
use crate::bot::dispatch::context::{Context, ContextValue, CONTEXT_STORE_NODES_KEY};
use crate::types::Update;

pub use library::{
    ApiNode, CallbackQueryNode, ChatSource, EventNode, Me, MessageNode, Payload, Source, Text,
    TextInteger, UpdateNode, UserSource,
};
pub use poly::{Morph, Polymorphic};
pub use set::NodeSet;

/// Node lifetime scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Fresh instance for every resolution.
    PerCall,
    /// Cached in the context for the duration of one update.
    PerEvent,
    /// Process-lifetime singleton, published once.
    Global,
}

/// A node's `compose` signalled failure; aborts the containing resolution
/// branch. For rules this yields a failed check.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("{0}")]
    Failed(String),

    #[error("node dependency cycle: {0}")]
    Cycle(String),

    #[error("no implementation of {node} composed, last error: {last}")]
    NoMorph { node: &'static str, last: String },

    #[error("node {0} missing from collection")]
    Missing(&'static str),
}

impl ComposeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A user-declared dependency-injected type.
#[async_trait::async_trait]
pub trait Node: Sized + Send + Sync + 'static {
    const SCOPE: Scope = Scope::PerCall;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError>;
}

/// Registration-time descriptor of one node type: what to resolve and how,
/// without knowing the type at the call site.
#[derive(Clone, Copy)]
pub struct NodeSpec {
    type_id: TypeId,
    type_name: &'static str,
    compose: for<'a> fn(&'a mut Composer) -> BoxFuture<'a, Result<ContextValue, ComposeError>>,
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeSpec").field(&self.type_name).finish()
    }
}

fn spec_compose<N: Node>(
    composer: &mut Composer,
) -> BoxFuture<'_, Result<ContextValue, ComposeError>> {
    Box::pin(async move {
        let value = composer.resolve::<N>().await?;
        Ok(value as ContextValue)
    })
}

impl NodeSpec {
    pub fn of<N: Node>() -> Self {
        Self {
            type_id: TypeId::of::<N>(),
            type_name: std::any::type_name::<N>(),
            compose: spec_compose::<N>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// One composed value with its scope, kept alive until its session closes.
struct Session {
    scope: Scope,
    _value: ContextValue,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("scope", &self.scope).finish()
    }
}

/// Composed `(node type → value)` results plus the open sessions behind them.
#[derive(Default)]
pub struct NodeCollection {
    values: Vec<(TypeId, &'static str, ContextValue)>,
    sessions: Vec<Session>,
}

impl std::fmt::Debug for NodeCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCollection")
            .field(
                "values",
                &self.values.iter().map(|(_, name, _)| name).collect::<Vec<_>>(),
            )
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl NodeCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed access to a composed root node.
    pub fn get<N: Node>(&self) -> Option<Arc<N>> {
        let id = TypeId::of::<N>();
        self.values
            .iter()
            .find(|(t, _, _)| *t == id)
            .and_then(|(_, _, v)| v.clone().downcast::<N>().ok())
    }

    /// Closes sessions in reverse resolution order. PER_CALL sessions release
    /// their values; PER_EVENT and GLOBAL values stay in their stores.
    pub fn close_all(&mut self) {
        while let Some(session) = self.sessions.pop() {
            if session.scope == Scope::PerCall {
                drop(session);
            }
        }
        self.values.clear();
    }
}

/// Per-event node store, installed in the context under
/// [`CONTEXT_STORE_NODES_KEY`] and shared by every context copy of one
/// update.
#[derive(Default)]
pub struct PerEventStore {
    entries: Mutex<HashMap<TypeId, ContextValue>>,
}

impl PerEventStore {
    fn get_raw(&self, id: TypeId) -> Option<ContextValue> {
        self.entries.lock().expect("node store poisoned").get(&id).cloned()
    }

    fn insert_raw(&self, id: TypeId, value: ContextValue) {
        self.entries.lock().expect("node store poisoned").insert(id, value);
    }

    /// Ends the event: drops every cached PER_EVENT value.
    pub fn close(&self) {
        self.entries.lock().expect("node store poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("node store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the update's node store, installing it on first use.
pub fn node_store(ctx: &mut Context) -> Arc<PerEventStore> {
    ctx.get_or_set(CONTEXT_STORE_NODES_KEY, PerEventStore::default)
}

static GLOBAL_NODES: Lazy<DashMap<TypeId, ContextValue>> = Lazy::new(DashMap::new);

/// The in-flight resolution: capability seeds, per-event store handle,
/// resolution stack, and the sessions opened so far.
pub struct Composer {
    api: Api,
    update: Arc<Update>,
    bound: BoundUpdate,
    ctx: Context,
    store: Arc<PerEventStore>,
    stack: Vec<(TypeId, &'static str)>,
    sessions: Vec<Session>,
}

impl Composer {
    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn raw_update(&self) -> &Arc<Update> {
        &self.update
    }

    pub fn bound_update(&self) -> &BoundUpdate {
        &self.bound
    }

    /// Read-only snapshot of the context at composition start.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Resolves a node, honoring its scope and detecting cycles.
    pub async fn resolve<N: Node>(&mut self) -> Result<Arc<N>, ComposeError> {
        let id = TypeId::of::<N>();
        let name = std::any::type_name::<N>();

        if self.stack.iter().any(|(t, _)| *t == id) {
            let chain = self
                .stack
                .iter()
                .map(|(_, n)| *n)
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ComposeError::Cycle(chain));
        }

        match N::SCOPE {
            Scope::Global => {
                if let Some(entry) = GLOBAL_NODES.get(&id) {
                    if let Ok(typed) = entry.value().clone().downcast::<N>() {
                        return Ok(typed);
                    }
                }
            }
            Scope::PerEvent => {
                if let Some(value) = self.store.get_raw(id) {
                    if let Ok(typed) = value.downcast::<N>() {
                        return Ok(typed);
                    }
                }
            }
            Scope::PerCall => {}
        }

        self.stack.push((id, name));
        let composed = N::compose(self).await;
        self.stack.pop();
        let value = Arc::new(composed?);

        match N::SCOPE {
            Scope::Global => {
                // Publish-once: a racing resolution keeps the first value.
                let published = GLOBAL_NODES
                    .entry(id)
                    .or_insert_with(|| value.clone() as ContextValue)
                    .value()
                    .clone();
                if let Ok(typed) = published.downcast::<N>() {
                    return Ok(typed);
                }
            }
            Scope::PerEvent => self.store.insert_raw(id, value.clone() as ContextValue),
            Scope::PerCall => {}
        }

        self.sessions.push(Session {
            scope: N::SCOPE,
            _value: value.clone() as ContextValue,
        });
        Ok(value)
    }

    /// How many sessions are open; morph attempts roll back to this mark.
    pub(crate) fn session_mark(&self) -> usize {
        self.sessions.len()
    }

    /// Drops sessions opened after `mark`, newest first.
    pub(crate) fn rollback_sessions(&mut self, mark: usize) {
        while self.sessions.len() > mark {
            self.sessions.pop();
        }
    }
}

/// Composes each spec in order; on failure, partial sessions are closed
/// without value propagation and the error is returned.
pub async fn compose_nodes(
    specs: &[NodeSpec],
    ctx: &mut Context,
    api: &Api,
    update: &Arc<Update>,
    bound: &BoundUpdate,
) -> Result<NodeCollection, ComposeError> {
    let store = node_store(ctx);
    let mut composer = Composer {
        api: api.clone(),
        update: update.clone(),
        bound: bound.clone(),
        ctx: ctx.copy(),
        store,
        stack: Vec::new(),
        sessions: Vec::new(),
    };

    let mut values = Vec::with_capacity(specs.len());
    for spec in specs {
        match (spec.compose)(&mut composer).await {
            Ok(value) => values.push((spec.type_id, spec.type_name, value)),
            Err(err) => {
                tracing::debug!(node = spec.type_name, error = %err, "node composition failed");
                composer.rollback_sessions(0);
                return Err(err);
            }
        }
    }

    Ok(NodeCollection {
        values,
        sessions: composer.sessions,
    })
}

/// Removes a GLOBAL node's published value; tests use this to reset state.
#[cfg(test)]
pub(crate) fn reset_global<N: Node>() {
    GLOBAL_NODES.remove(&TypeId::of::<N>());
}
