//! Dispatch: context, rules checking, handlers, middlewares, views, the
//! dispatcher itself, and the waiter machine.

pub mod context;
#[allow(clippy::module_inception)]
pub mod dispatch;
pub mod handler;
pub mod middleware;
pub mod process;
pub mod return_manager;
pub mod view;
pub mod waiter;

pub use context::{Context, ContextValue, CONTEXT_STORE_NODES_KEY, I18N_KEY};
pub use dispatch::Dispatcher;
pub use handler::{ArcHandler, FuncHandler, Handler, HandlerResult};
pub use middleware::{ArcMiddleware, GlobalMiddleware, Middleware};
pub use process::{check_rule, process_inner};
pub use return_manager::{
    CallbackQueryReturnManager, IntoResponse, MessageReturnManager, Response, ReturnManager,
};
pub use view::{View, ViewId};
pub use waiter::{
    Hasher, LimitedDict, ShortState, WaiterActions, WaiterError, WaiterMachine, WaiterMiddleware,
};
