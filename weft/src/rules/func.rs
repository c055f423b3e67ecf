//! Ad-hoc predicate rules from closures.

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::node::NodeCollection;

use super::{AdapterSpec, Rule};

/// Wraps a plain predicate over the adapted event and context.
pub struct FuncRule<F> {
    adapter: AdapterSpec,
    func: F,
}

impl<F> FuncRule<F>
where
    F: Fn(&Event, &mut Context) -> bool + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            adapter: AdapterSpec::Raw,
            func,
        }
    }

    /// Runs the predicate on the typed payload instead of the raw update.
    pub fn with_adapter(mut self, adapter: AdapterSpec) -> Self {
        self.adapter = adapter;
        self
    }
}

#[async_trait]
impl<F> Rule for FuncRule<F>
where
    F: Fn(&Event, &mut Context) -> bool + Send + Sync + 'static,
{
    fn adapter(&self) -> AdapterSpec {
        self.adapter
    }

    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        (self.func)(event, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{check, message_update};
    use crate::rules::RuleExt;

    /// **Scenario**: The closure decides, and may stash values in the context.
    #[tokio::test]
    async fn closure_predicate() {
        let rule = FuncRule::new(|event: &Event, ctx: &mut Context| {
            let long = event.text().map(|t| t.len() > 3).unwrap_or(false);
            if long {
                ctx.set("len", event.text().map(|t| t.len()).unwrap_or(0));
            }
            long
        })
        .with_adapter(AdapterSpec::message())
        .arc();
        assert!(check(&rule, message_update("long enough")).await);
        assert!(!check(&rule, message_update("no")).await);
    }
}
