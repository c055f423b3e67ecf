//! The API handle: request URL assembly, the response envelope, and the
//! typed methods the runtime itself needs.
//!
//! The full generated method surface lives outside the core; handlers can
//! always fall back to [`Api::request`] with a raw method name and form.

mod error;
mod response;
mod token;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::{Client, Form, ReqwestClient};
use crate::settings::Settings;
use crate::types::{Message, Update, UpdateType, User};

pub use error::ApiError;
pub use response::ApiResponse;
pub use token::{InvalidTokenError, Token};

/// Default API endpoints; override via [`Api::with_base_urls`] or
/// [`crate::settings::Settings`].
pub const API_URL: &str = "https://api.telegram.org/";
pub const API_FILE_URL: &str = "https://api.telegram.org/file/";

/// Shared handle over the transport: owns the token and the base URLs.
///
/// Cheap to clone; every bound event and node capability seed carries one.
#[derive(Clone)]
pub struct Api {
    token: Token,
    client: Arc<dyn Client>,
    base_url: String,
    file_base_url: String,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("token", &self.token)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Api {
    pub fn new(token: Token, client: Arc<dyn Client>) -> Self {
        Self {
            token,
            client,
            base_url: API_URL.to_string(),
            file_base_url: API_FILE_URL.to_string(),
        }
    }

    /// Production handle built from the recognized options: a reqwest
    /// transport with `http_timeout`, requests against the configured base
    /// URLs.
    pub fn from_settings(token: Token, settings: &Settings) -> Self {
        Self::new(token, Arc::new(ReqwestClient::new(settings.http_timeout))).with_base_urls(
            settings.api_base_url.clone(),
            settings.api_file_base_url.clone(),
        )
    }

    pub fn with_base_urls(
        mut self,
        base_url: impl Into<String>,
        file_base_url: impl Into<String>,
    ) -> Self {
        self.base_url = base_url.into();
        self.file_base_url = file_base_url.into();
        self
    }

    /// Numeric bot id from the token.
    pub fn id(&self) -> i64 {
        self.token.bot_id()
    }

    fn request_url(&self, method: &str) -> String {
        format!("{}bot{}/{}", self.base_url, self.token.as_str(), method)
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}bot{}/{}", self.file_base_url, self.token.as_str(), path)
    }

    /// Raw call: posts the form to `<base>/bot<token>/<method>` and resolves
    /// the `{ ok, result }` envelope into the untyped result.
    pub async fn request(&self, method: &str, form: Form) -> Result<serde_json::Value, ApiError> {
        let raw = self.client.request_json(&self.request_url(method), form).await?;
        let response: ApiResponse<serde_json::Value> = serde_json::from_value(raw)?;
        response.into_result()
    }

    /// Raw call decoded into a typed result.
    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let result = self.request(method, form).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `getUpdates` with the long-poll parameters the poller maintains.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: u64,
        allowed_updates: &[UpdateType],
    ) -> Result<Vec<Update>, ApiError> {
        let mut form = Form::new().field("offset", offset).field("timeout", timeout);
        if !allowed_updates.is_empty() {
            let names: Vec<&str> = allowed_updates.iter().map(|t| t.name()).collect();
            form = form.field("allowed_updates", names);
        }
        self.request_typed("getUpdates", form).await
    }

    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.request_typed("getMe", Form::new()).await
    }

    pub async fn send_message(&self, params: SendMessageParams) -> Result<Message, ApiError> {
        self.request_typed("sendMessage", params.into_form()).await
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<bool, ApiError> {
        let mut form = Form::new().field("callback_query_id", callback_query_id);
        if let Some(text) = text {
            form = form.field("text", text);
        }
        if show_alert {
            form = form.field("show_alert", true);
        }
        self.request_typed("answerCallbackQuery", form).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<Message, ApiError> {
        let form = Form::new()
            .field("chat_id", chat_id)
            .field("message_id", message_id)
            .field("text", text);
        self.request_typed("editMessageText", form).await
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<bool, ApiError> {
        let form = Form::new()
            .field("chat_id", chat_id)
            .field("message_id", message_id);
        self.request_typed("deleteMessage", form).await
    }

    pub async fn approve_chat_join_request(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<bool, ApiError> {
        let form = Form::new().field("chat_id", chat_id).field("user_id", user_id);
        self.request_typed("approveChatJoinRequest", form).await
    }

    pub async fn decline_chat_join_request(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<bool, ApiError> {
        let form = Form::new().field("chat_id", chat_id).field("user_id", user_id);
        self.request_typed("declineChatJoinRequest", form).await
    }

    pub async fn answer_pre_checkout_query(
        &self,
        pre_checkout_query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut form = Form::new()
            .field("pre_checkout_query_id", pre_checkout_query_id)
            .field("ok", ok);
        if let Some(message) = error_message {
            form = form.field("error_message", message);
        }
        self.request_typed("answerPreCheckoutQuery", form).await
    }

    /// Downloads a file body from `<file base>/bot<token>/<path>`.
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, ApiError> {
        Ok(self
            .client
            .request_bytes(&self.file_url(file_path), Form::new())
            .await?)
    }
}

/// Parameters for `sendMessage`; only the fields the runtime and the return
/// managers use.
#[derive(Clone, Debug)]
pub struct SendMessageParams {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<String>,
    pub message_thread_id: Option<i64>,
    pub reply_to_message_id: Option<i64>,
}

impl SendMessageParams {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            message_thread_id: None,
            reply_to_message_id: None,
        }
    }

    pub fn parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }

    pub fn thread(mut self, message_thread_id: Option<i64>) -> Self {
        self.message_thread_id = message_thread_id;
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    fn into_form(self) -> Form {
        Form::new()
            .field("chat_id", self.chat_id)
            .field("text", self.text)
            .field("parse_mode", self.parse_mode)
            .field("message_thread_id", self.message_thread_id)
            .field("reply_to_message_id", self.reply_to_message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;

    fn api_with(client: MockClient) -> Api {
        Api::new(Token::new("42:testsecret").unwrap(), Arc::new(client))
    }

    /// **Scenario**: Request URLs follow `<base>/bot<token>/<method>`.
    #[tokio::test]
    async fn request_url_shape() {
        let client = MockClient::new();
        let api = api_with(client.clone());
        let _ = api.request("getMe", Form::new()).await;
        let seen = client.requests();
        assert_eq!(seen[0].url, "https://api.telegram.org/bot42:testsecret/getMe");
    }

    /// **Scenario**: Configured base URLs replace the defaults in request
    /// assembly.
    #[tokio::test]
    async fn custom_base_urls_are_used() {
        let client = MockClient::new();
        let api = Api::new(Token::new("42:testsecret").unwrap(), Arc::new(client.clone()))
            .with_base_urls("https://proxy.local/", "https://proxy.local/file/");
        let _ = api.request("getMe", Form::new()).await;
        assert_eq!(
            client.requests()[0].url,
            "https://proxy.local/bot42:testsecret/getMe"
        );
    }

    /// **Scenario**: A failure envelope surfaces as ApiError with its code.
    #[tokio::test]
    async fn error_envelope_becomes_api_error() {
        let client = MockClient::new();
        client.push_response(serde_json::json!({
            "ok": false, "error_code": 401, "description": "Unauthorized"
        }));
        let api = api_with(client);
        let err = api.get_me().await.unwrap_err();
        assert_eq!(err.code(), Some(401));
    }

    /// **Scenario**: getUpdates sends offset, timeout and allowed_updates names.
    #[tokio::test]
    async fn get_updates_parameters() {
        let client = MockClient::new();
        client.push_response(serde_json::json!({"ok": true, "result": []}));
        let api = api_with(client.clone());
        let updates = api
            .get_updates(10, 30, &[UpdateType::Message, UpdateType::CallbackQuery])
            .await
            .unwrap();
        assert!(updates.is_empty());
        let seen = &client.requests()[0];
        assert_eq!(seen.fields["offset"], 10);
        assert_eq!(seen.fields["timeout"], 30);
        assert_eq!(
            seen.fields["allowed_updates"],
            serde_json::json!(["message", "callback_query"])
        );
    }
}
