//! Message text rules.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::i18n::Translator;
use crate::node::NodeCollection;

use super::{AdapterSpec, ArcRule, Rule};

/// Passes for any message that carries text.
pub struct HasText;

#[async_trait]
impl Rule for HasText {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::message()
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event.as_message().map(|m| m.text().is_some()).unwrap_or(false)
    }
}

/// Matches the message text against one of the given literals.
///
/// The literals are human-readable and therefore translatable: with a
/// translator in the context the rule is checked in its translated form.
pub struct Text {
    texts: Vec<String>,
    ignore_case: bool,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self::any([text.into()])
    }

    pub fn any(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    fn matches(&self, text: &str) -> bool {
        if self.ignore_case {
            let lowered = text.to_lowercase();
            self.texts.iter().any(|t| t.to_lowercase() == lowered)
        } else {
            self.texts.iter().any(|t| t == text)
        }
    }
}

#[async_trait]
impl Rule for Text {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::message()
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event
            .as_message()
            .and_then(|m| m.text())
            .map(|t| self.matches(t))
            .unwrap_or(false)
    }

    fn translate(&self, translator: &dyn Translator) -> Option<ArcRule> {
        Some(Arc::new(Text {
            texts: self.texts.iter().map(|t| translator.translate(t)).collect(),
            ignore_case: self.ignore_case,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{check, message_update};
    use crate::rules::RuleExt;

    /// **Scenario**: Text matches its literal exactly, case-sensitively by default.
    #[tokio::test]
    async fn exact_match() {
        assert!(check(&Text::new("/start").arc(), message_update("/start")).await);
        assert!(!check(&Text::new("/start").arc(), message_update("/Start")).await);
    }

    /// **Scenario**: ignore_case folds both sides.
    #[tokio::test]
    async fn case_insensitive() {
        let rule = Text::new("Hello").ignore_case().arc();
        assert!(check(&rule, message_update("hELLo")).await);
    }

    /// **Scenario**: A callback-query update never matches a message text rule.
    #[tokio::test]
    async fn wrong_kind_fails_via_adapter() {
        use crate::rules::tests_support::callback_update;
        assert!(!check(&Text::new("x").arc(), callback_update("x")).await);
    }
}
