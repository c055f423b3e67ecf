//! A chat join request bound to the API.

use crate::api::{Api, ApiError};
use crate::types::ChatJoinRequest;

#[derive(Clone, Debug)]
pub struct BoundChatJoinRequest {
    pub request: ChatJoinRequest,
    pub api: Api,
}

impl BoundChatJoinRequest {
    pub fn new(request: ChatJoinRequest, api: Api) -> Self {
        Self { request, api }
    }

    pub async fn approve(&self) -> Result<bool, ApiError> {
        self.api
            .approve_chat_join_request(self.request.chat.id, self.request.from.id)
            .await
    }

    pub async fn decline(&self) -> Result<bool, ApiError> {
        self.api
            .decline_chat_join_request(self.request.chat.id, self.request.from.id)
            .await
    }
}

impl std::ops::Deref for BoundChatJoinRequest {
    type Target = ChatJoinRequest;

    fn deref(&self) -> &ChatJoinRequest {
        &self.request
    }
}
