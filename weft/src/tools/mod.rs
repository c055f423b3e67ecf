//! Support tooling: error recovery, lifespan tasks, bounded maps, state
//! storage.

pub mod error_handler;
pub mod lifespan;
pub mod limited_dict;
pub mod state_storage;

pub use error_handler::{Catcher, ErrorHandler, HandlerError};
pub use lifespan::Lifespan;
pub use limited_dict::LimitedDict;
pub use state_storage::{InMemoryStateStorage, StateStorage};
