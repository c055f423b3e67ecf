//! Structured recovery for handler failures.
//!
//! A [`Catcher`] declares which error kinds it recovers from and the
//! recovery callable; the [`ErrorHandler`] wraps a handler invocation and
//! routes a failure through the catcher when it matches. Non-matching
//! failures propagate to the dispatcher, which logs and moves on.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::bot::dispatch::return_manager::Response;

/// A failure raised from a user handler (or from composing its arguments).
#[derive(Debug)]
pub struct HandlerError(Box<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(error))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    pub fn is<E: std::error::Error + 'static>(&self) -> bool {
        self.0.downcast_ref::<E>().is_some()
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for HandlerError {}

impl From<crate::api::ApiError> for HandlerError {
    fn from(error: crate::api::ApiError) -> Self {
        Self::new(error)
    }
}

impl From<crate::node::ComposeError> for HandlerError {
    fn from(error: crate::node::ComposeError) -> Self {
        Self::new(error)
    }
}

type Matcher = Arc<dyn Fn(&HandlerError) -> bool + Send + Sync>;
type Recover = Arc<
    dyn Fn(HandlerError, Event, Context) -> BoxFuture<'static, Result<Response, HandlerError>>
        + Send
        + Sync,
>;

/// Recovery callable plus the set of error kinds it catches.
#[derive(Clone)]
pub struct Catcher {
    matchers: Vec<Matcher>,
    recover: Recover,
    logging: bool,
    raise_exception: bool,
    ignore_errors: bool,
}

impl Catcher {
    pub fn new<F, Fut>(recover: F) -> Self
    where
        F: Fn(HandlerError, Event, Context) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, HandlerError>> + Send + 'static,
    {
        Self {
            matchers: Vec::new(),
            recover: Arc::new(move |err, event, ctx| Box::pin(recover(err, event, ctx))),
            logging: false,
            raise_exception: false,
            ignore_errors: false,
        }
    }

    /// Catches failures whose source downcasts to `E`.
    pub fn catch<E: std::error::Error + 'static>(mut self) -> Self {
        self.matchers.push(Arc::new(|err| err.is::<E>()));
        self
    }

    /// Catches failures the predicate accepts (kind plus payload matching).
    pub fn catch_when(
        mut self,
        predicate: impl Fn(&HandlerError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.matchers.push(Arc::new(predicate));
        self
    }

    /// Catches every failure.
    pub fn catch_any(mut self) -> Self {
        self.matchers.push(Arc::new(|_| true));
        self
    }

    /// Logs caught failures and recovery failures.
    pub fn logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Re-raises a recovery failure instead of swallowing it.
    pub fn raise_exception(mut self) -> Self {
        self.raise_exception = true;
        self
    }

    /// Swallows recovery failures.
    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    fn matches(&self, error: &HandlerError) -> bool {
        self.matchers.iter().any(|m| m(error))
    }
}

/// Wraps handler results; owned by every handler (possibly with no catcher).
#[derive(Clone, Default)]
pub struct ErrorHandler {
    catcher: Option<Catcher>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catcher(catcher: Catcher) -> Self {
        Self {
            catcher: Some(catcher),
        }
    }

    /// Routes a failed handler result through the catcher.
    pub async fn run(
        &self,
        result: Result<Response, HandlerError>,
        event: &Event,
        ctx: &Context,
    ) -> Result<Response, HandlerError> {
        let error = match result {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };
        let Some(catcher) = &self.catcher else {
            return Err(error);
        };
        if !catcher.matches(&error) {
            return Err(error);
        }
        if catcher.logging {
            tracing::error!(error = %error, "handler failed, running catcher");
        }
        match (catcher.recover)(error, event.clone(), ctx.copy()).await {
            Ok(response) => Ok(response),
            Err(recovery_error) => {
                if catcher.raise_exception {
                    return Err(recovery_error);
                }
                if catcher.logging {
                    tracing::error!(error = %recovery_error, "catcher itself failed");
                }
                if catcher.ignore_errors {
                    Ok(Response::Ignore)
                } else {
                    Err(recovery_error)
                }
            }
        }
    }
}
