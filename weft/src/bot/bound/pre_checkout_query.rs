//! A pre-checkout query bound to the API.

use crate::api::{Api, ApiError};
use crate::types::PreCheckoutQuery;

#[derive(Clone, Debug)]
pub struct BoundPreCheckoutQuery {
    pub query: PreCheckoutQuery,
    pub api: Api,
}

impl BoundPreCheckoutQuery {
    pub fn new(query: PreCheckoutQuery, api: Api) -> Self {
        Self { query, api }
    }

    /// Confirms the checkout.
    pub async fn ok(&self) -> Result<bool, ApiError> {
        self.api
            .answer_pre_checkout_query(&self.query.id, true, None)
            .await
    }

    /// Rejects the checkout with a user-visible reason.
    pub async fn error(&self, message: &str) -> Result<bool, ApiError> {
        self.api
            .answer_pre_checkout_query(&self.query.id, false, Some(message))
            .await
    }
}

impl std::ops::Deref for BoundPreCheckoutQuery {
    type Target = PreCheckoutQuery;

    fn deref(&self) -> &PreCheckoutQuery {
        &self.query
    }
}
