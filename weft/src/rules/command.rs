//! `/command` parsing with validated arguments.
//!
//! `Command::new("sum").arg(Argument::int("x")).arg(Argument::int("y"))`
//! matches `/sum 2 3`, validates both tokens and stores them in the context
//! under the argument names.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::{Context, ContextValue};
use crate::node::NodeCollection;

use super::{AdapterSpec, Rule};

type Validator = Arc<dyn Fn(&str) -> Option<ContextValue> + Send + Sync>;

/// One positional command argument with its validator.
///
/// The validator turns the raw token into the typed value stored in the
/// context, or `None` when the token is unacceptable.
#[derive(Clone)]
pub struct Argument {
    name: &'static str,
    validator: Validator,
    optional: bool,
}

impl Argument {
    pub fn new<T: Send + Sync + 'static>(
        name: &'static str,
        validate: impl Fn(&str) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            validator: Arc::new(move |token| {
                validate(token).map(|v| Arc::new(v) as ContextValue)
            }),
            optional: false,
        }
    }

    /// Accepts any token as a `String`.
    pub fn string(name: &'static str) -> Self {
        Self::new(name, |token| Some(token.to_string()))
    }

    /// Accepts base-10 integers as `i64`.
    pub fn int(name: &'static str) -> Self {
        Self::new(name, |token| token.parse::<i64>().ok())
    }

    /// Marks the argument optional: it may be absent at the tail of the
    /// command, but when present it must still validate.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Matches `/name[@bot] token token …` and binds validated tokens to
/// argument names in the context.
pub struct Command {
    names: Vec<String>,
    arguments: Vec<Argument>,
    prefix: char,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            arguments: Vec::new(),
            prefix: '/',
        }
    }

    /// Additional alias for the same command.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn arg(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Splits `text` into the command name and argument tokens; `None` when
    /// the text is not this command.
    fn parse<'t>(&self, text: &'t str) -> Option<Vec<&'t str>> {
        let text = text.strip_prefix(self.prefix)?;
        let mut tokens = text.split_whitespace();
        let head = tokens.next()?;
        // "/sum@my_bot" addresses a specific bot; the mention is not a name part.
        let name = head.split('@').next()?;
        if !self.names.iter().any(|n| n == name) {
            return None;
        }
        Some(tokens.collect())
    }

    fn bind(&self, tokens: &[&str], ctx: &mut Context) -> bool {
        if tokens.len() > self.arguments.len() {
            return false;
        }
        // Validate everything before touching the context, so a failed check
        // leaves no partial bindings behind.
        let mut bound: Vec<(&'static str, ContextValue)> = Vec::with_capacity(tokens.len());
        for (index, argument) in self.arguments.iter().enumerate() {
            match tokens.get(index) {
                Some(token) => match (argument.validator)(token) {
                    Some(value) => bound.push((argument.name, value)),
                    None => return false,
                },
                None if argument.optional => continue,
                None => return false,
            }
        }
        for (name, value) in bound {
            ctx.set_arc(name, value);
        }
        true
    }
}

#[async_trait]
impl Rule for Command {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::message()
    }

    async fn check(&self, event: &Event, ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        let Some(text) = event.as_message().and_then(|m| m.text()) else {
            return false;
        };
        match self.parse(text) {
            Some(tokens) => self.bind(&tokens, ctx),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{check, check_with_ctx, message_update};
    use crate::rules::RuleExt;

    /// **Scenario**: `/sum 2 3` binds x=2 and y=3 into the context.
    #[tokio::test]
    async fn binds_validated_arguments() {
        let rule = Command::new("sum")
            .arg(Argument::int("x"))
            .arg(Argument::int("y"))
            .arc();
        let (passed, ctx) = check_with_ctx(&rule, message_update("/sum 2 3")).await;
        assert!(passed);
        assert_eq!(*ctx.get::<i64>("x").unwrap(), 2);
        assert_eq!(*ctx.get::<i64>("y").unwrap(), 3);
    }

    /// **Scenario**: A non-numeric token fails validation, so the rule fails.
    #[tokio::test]
    async fn invalid_argument_fails() {
        let rule = Command::new("sum")
            .arg(Argument::int("x"))
            .arg(Argument::int("y"))
            .arc();
        assert!(!check(&rule, message_update("/sum two 3")).await);
    }

    /// **Scenario**: Context stays clean when the rule fails (transactional check).
    #[tokio::test]
    async fn failed_check_leaves_no_bindings() {
        let rule = Command::new("sum")
            .arg(Argument::int("x"))
            .arg(Argument::int("y"))
            .arc();
        let (passed, ctx) = check_with_ctx(&rule, message_update("/sum 2 oops")).await;
        assert!(!passed);
        assert!(ctx.get::<i64>("x").is_none(), "x must not leak from a failed check");
    }

    /// **Scenario**: Bot mentions, aliases and optional tail arguments.
    #[tokio::test]
    async fn mention_alias_optional() {
        let rule = Command::new("start")
            .alias("go")
            .arg(Argument::string("mode").optional())
            .arc();
        assert!(check(&rule, message_update("/start@some_bot")).await);
        assert!(check(&rule, message_update("/go fast")).await);
        assert!(!check(&rule, message_update("/stop")).await);
        assert!(!check(&rule, message_update("/go too many args")).await);
    }
}
