//! Callback query payload rules.

use async_trait::async_trait;
use serde_json::Value;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::node::NodeCollection;
use crate::types::UpdateType;

use super::{AdapterSpec, Rule};

/// Context key the decoded callback payload lands under.
pub const CALLBACK_DATA_KEY: &str = "callback_data";

const CALLBACK_KINDS: &[UpdateType] = &[UpdateType::CallbackQuery];

/// Callback data equals the given string.
pub struct CallbackDataEq(pub String);

impl CallbackDataEq {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }
}

#[async_trait]
impl Rule for CallbackDataEq {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::Event(CALLBACK_KINDS)
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event
            .as_callback_query()
            .and_then(|q| q.data())
            .map(|d| d == self.0)
            .unwrap_or(false)
    }
}

/// Callback data decodes as JSON equal to the given document.
pub struct CallbackDataJsonEq(pub Value);

impl CallbackDataJsonEq {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

#[async_trait]
impl Rule for CallbackDataJsonEq {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::Event(CALLBACK_KINDS)
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event
            .as_callback_query()
            .and_then(|q| q.data())
            .and_then(|d| serde_json::from_str::<Value>(d).ok())
            .map(|decoded| decoded == self.0)
            .unwrap_or(false)
    }
}

/// Callback data decodes as a JSON object; the decoded map lands in the
/// context under [`CALLBACK_DATA_KEY`].
pub struct CallbackDataMap;

#[async_trait]
impl Rule for CallbackDataMap {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::Event(CALLBACK_KINDS)
    }

    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        let decoded = event
            .as_callback_query()
            .and_then(|q| q.data())
            .and_then(|d| serde_json::from_str::<Value>(d).ok());
        match decoded {
            Some(Value::Object(map)) => {
                ctx.set(CALLBACK_DATA_KEY, Value::Object(map));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{callback_update, check, check_with_ctx, message_update};
    use crate::rules::RuleExt;

    /// **Scenario**: Exact payload match passes, others fail.
    #[tokio::test]
    async fn eq_matches_payload() {
        assert!(check(&CallbackDataEq::new("pick:1").arc(), callback_update("pick:1")).await);
        assert!(!check(&CallbackDataEq::new("pick:1").arc(), callback_update("pick:2")).await);
        assert!(!check(&CallbackDataEq::new("pick:1").arc(), message_update("pick:1")).await);
    }

    /// **Scenario**: JSON payloads compare structurally, not textually.
    #[tokio::test]
    async fn json_eq_structural() {
        let rule = CallbackDataJsonEq::new(serde_json::json!({"a": 1, "b": 2})).arc();
        assert!(check(&rule, callback_update("{\"b\": 2, \"a\": 1}")).await);
        assert!(!check(&rule, callback_update("{\"a\": 1}")).await);
    }

    /// **Scenario**: CallbackDataMap stores the decoded object in the context.
    #[tokio::test]
    async fn map_lands_in_context() {
        let (passed, ctx) =
            check_with_ctx(&CallbackDataMap.arc(), callback_update("{\"page\": 3}")).await;
        assert!(passed);
        let data = ctx.get::<Value>(CALLBACK_DATA_KEY).unwrap();
        assert_eq!(data["page"], 3);
    }
}
