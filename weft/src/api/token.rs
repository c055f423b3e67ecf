//! Bot token: `<digits>:<opaque>`, validated at construction.

use thiserror::Error;

/// Raised when a token string does not match `<digits>:<opaque>`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid bot token: {0}")]
pub struct InvalidTokenError(pub String);

/// Validated bot token. The numeric part before the colon is the bot id.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Result<Self, InvalidTokenError> {
        let token = token.into();
        let Some((id, rest)) = token.split_once(':') else {
            return Err(InvalidTokenError("missing ':' separator".into()));
        };
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTokenError("bot id part is not numeric".into()));
        }
        if rest.is_empty() {
            return Err(InvalidTokenError("secret part is empty".into()));
        }
        Ok(Self(token))
    }

    /// Reads the token from the environment (default variable `BOT_TOKEN`).
    ///
    /// Run an [`env_config::Loader`] first if the token lives in a project
    /// `.env` or an XDG config.
    pub fn from_env(var: Option<&str>) -> Result<Self, InvalidTokenError> {
        let var = var.unwrap_or("BOT_TOKEN");
        let value = std::env::var(var)
            .map_err(|_| InvalidTokenError(format!("environment variable {var} is not set")))?;
        Self::new(value)
    }

    /// The numeric bot id encoded before the colon.
    pub fn bot_id(&self) -> i64 {
        // Validated in `new`; digits-only prefix always parses.
        self.0
            .split_once(':')
            .and_then(|(id, _)| id.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret never lands in logs.
        write!(f, "Token({}:***)", self.bot_id())
    }
}

impl std::str::FromStr for Token {
    type Err = InvalidTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
