//! Typed node requirements for handlers and rules: a tuple of node types
//! declared at registration time.
//!
//! `specs()` is the registration-time table the dispatcher composes from;
//! `extract()` gathers the composed values back into the tuple shape the
//! handler was written against.

use std::sync::Arc;

use super::{ComposeError, Node, NodeCollection, NodeSpec};

/// A fixed set of nodes a handler (or rule) requires.
pub trait NodeSet: Sized + Send + 'static {
    fn specs() -> Vec<NodeSpec>;

    fn extract(collection: &NodeCollection) -> Result<Self, ComposeError>;
}

impl NodeSet for () {
    fn specs() -> Vec<NodeSpec> {
        Vec::new()
    }

    fn extract(_collection: &NodeCollection) -> Result<Self, ComposeError> {
        Ok(())
    }
}

macro_rules! impl_node_set {
    ($($name:ident),+) => {
        impl<$($name: Node),+> NodeSet for ($(Arc<$name>,)+) {
            fn specs() -> Vec<NodeSpec> {
                vec![$(NodeSpec::of::<$name>()),+]
            }

            fn extract(collection: &NodeCollection) -> Result<Self, ComposeError> {
                Ok(($(
                    collection
                        .get::<$name>()
                        .ok_or(ComposeError::Missing(std::any::type_name::<$name>()))?,
                )+))
            }
        }
    };
}

impl_node_set!(A);
impl_node_set!(A, B);
impl_node_set!(A, B, C);
impl_node_set!(A, B, C, D);
impl_node_set!(A, B, C, D, E);
