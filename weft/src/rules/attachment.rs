//! Message attachment gates.

use async_trait::async_trait;

use crate::bot::bound::Event;
use crate::bot::dispatch::context::Context;
use crate::node::NodeCollection;

use super::{AdapterSpec, Rule};

/// The message carries at least one photo size.
pub struct HasPhoto;

#[async_trait]
impl Rule for HasPhoto {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::message()
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event
            .as_message()
            .map(|m| !m.message.photo.is_empty())
            .unwrap_or(false)
    }
}

/// The message carries a document.
pub struct HasDocument;

#[async_trait]
impl Rule for HasDocument {
    fn adapter(&self) -> AdapterSpec {
        AdapterSpec::message()
    }

    async fn check(&self, event: &Event, _ctx: &mut Context, _nodes: &NodeCollection) -> bool {
        event
            .as_message()
            .map(|m| m.message.document.is_some())
            .unwrap_or(false)
    }
}
