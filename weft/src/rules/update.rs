//! Update-kind gate.

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::node::NodeCollection;
use crate::types::UpdateType;

use super::Rule;

/// Passes when the update is of the given kind.
pub struct IsUpdateType(pub UpdateType);

#[async_trait]
impl Rule for IsUpdateType {
    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        ctx.raw_update().kind() == Some(self.0) || event.kind() == Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{callback_update, check, message_update};
    use crate::rules::RuleExt;

    /// **Scenario**: The gate passes only for its own update kind.
    #[tokio::test]
    async fn gates_on_kind() {
        let rule = IsUpdateType(UpdateType::CallbackQuery).arc();
        assert!(check(&rule, callback_update("d")).await);
        assert!(!check(&rule, message_update("d")).await);
    }
}
