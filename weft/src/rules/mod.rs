//! Rule algebra: predicates over adapted updates, composed with `and`,
//! `or` and `not`.
//!
//! A rule exposes an adapter, an ordered list of prerequisite rules, a set
//! of required nodes, and the check predicate itself. Checks run through
//! [`crate::bot::dispatch::process::check_rule`], which handles adaptation,
//! requirements, translation, node composition and context merging; the
//! combinators below only decide how child results and contexts combine.

mod adapter;
pub mod attachment;
pub mod callback_data;
pub mod command;
pub mod func;
pub mod is_from;
pub mod text;
pub mod update;

#[cfg(test)]
pub(crate) mod tests_support;

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::process::check_rule;
use crate::i18n::Translator;
use crate::node::{NodeCollection, NodeSpec};

pub use adapter::{AdapterError, AdapterSpec, CHAT_MEMBER_KINDS, MESSAGE_KINDS};
pub use attachment::{HasDocument, HasPhoto};
pub use callback_data::{CallbackDataEq, CallbackDataJsonEq, CallbackDataMap, CALLBACK_DATA_KEY};
pub use command::{Argument, Command};
pub use func::FuncRule;
pub use is_from::{IsChatId, IsGroup, IsPrivate, IsUserId};
pub use text::{HasText, Text};
pub use update::IsUpdateType;

/// Shared rule handle, as stored by handlers and views.
pub type ArcRule = Arc<dyn Rule>;

/// A predicate over an adapted update plus the metadata the checker needs.
#[async_trait]
pub trait Rule: Send + Sync + 'static {
    /// How the raw update is adapted before `check` runs. Adapter failure
    /// means "rule does not apply".
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::Raw
    }

    /// Prerequisite rules, checked in order against a scratch context that
    /// is merged into the caller's only when all of them pass.
    fn requires(&self) -> Vec<ArcRule> {
        Vec::new()
    }

    /// Nodes to compose before `check`; composition failure fails the check.
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    async fn check(&self, event: &Event, ctx: &mut Context, nodes: &NodeCollection) -> bool;

    /// Locale-specific form of this rule; `None` when there is nothing to
    /// translate. Memoized by [`crate::i18n::translate_rule`].
    fn translate(&self, _translator: &dyn Translator) -> Option<ArcRule> {
        None
    }
}

/// Combinator constructors for any sized rule.
pub trait RuleExt: Rule + Sized {
    fn arc(self) -> ArcRule {
        Arc::new(self)
    }

    fn and(self, other: impl Rule) -> AndRule {
        AndRule::new(vec![Arc::new(self), Arc::new(other)])
    }

    fn or(self, other: impl Rule) -> OrRule {
        OrRule::new(vec![Arc::new(self), Arc::new(other)])
    }

    fn not(self) -> NotRule {
        NotRule::new(Arc::new(self))
    }
}

impl<R: Rule + Sized> RuleExt for R {}

/// Conjunction: children share one scratch context, committed on full success.
pub struct AndRule {
    rules: Vec<ArcRule>,
}

impl AndRule {
    pub fn new(rules: Vec<ArcRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Rule for AndRule {
    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        let api = event.api().clone();
        let update = ctx.raw_update();
        let mut scratch = ctx.copy();
        for rule in &self.rules {
            if !check_rule(&api, rule, &update, &mut scratch).await {
                return false;
            }
        }
        ctx.merge(scratch);
        true
    }
}

/// Disjunction: each child gets an independent scratch context; the first
/// success commits its context and wins.
pub struct OrRule {
    rules: Vec<ArcRule>,
}

impl OrRule {
    pub fn new(rules: Vec<ArcRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Rule for OrRule {
    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        let api = event.api().clone();
        let update = ctx.raw_update();
        for rule in &self.rules {
            let mut scratch = ctx.copy();
            if check_rule(&api, rule, &update, &mut scratch).await {
                ctx.merge(scratch);
                return true;
            }
        }
        false
    }
}

/// Negation over a scratch context that is always discarded.
pub struct NotRule {
    rule: ArcRule,
}

impl NotRule {
    pub fn new(rule: ArcRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl Rule for NotRule {
    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        let api = event.api().clone();
        let update = ctx.raw_update();
        let mut scratch = ctx.copy();
        !check_rule(&api, &self.rule, &update, &mut scratch).await
    }
}
