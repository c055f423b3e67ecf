//! An inline query bound to the API.

use crate::api::Api;
use crate::types::InlineQuery;

#[derive(Clone, Debug)]
pub struct BoundInlineQuery {
    pub query: InlineQuery,
    pub api: Api,
}

impl BoundInlineQuery {
    pub fn new(query: InlineQuery, api: Api) -> Self {
        Self { query, api }
    }

    pub fn text(&self) -> &str {
        &self.query.query
    }
}

impl std::ops::Deref for BoundInlineQuery {
    type Target = InlineQuery;

    fn deref(&self) -> &InlineQuery {
        &self.query
    }
}
