//! Transport seam: the HTTP client the framework talks to the upstream
//! API through.
//!
//! Two operations are expected ([`Client::request_json`],
//! [`Client::request_bytes`]); the form is either a JSON body or a
//! multipart form once file parts are attached. [`ReqwestClient`] is the
//! production implementation; [`MockClient`] scripts responses for tests.

mod mock;
mod reqwest_client;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use mock::{MockClient, RecordedRequest};
pub use reqwest_client::ReqwestClient;

/// Transport failure: network, HTTP status or body decode.
///
/// Never surfaced to handlers; the poller retries with backoff and API
/// callers receive it wrapped in their own error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Request payload: named fields plus optional file parts.
///
/// Without files it is sent as a JSON body; with files as a multipart form
/// with each file part as `(filename, bytes)`.
#[derive(Clone, Debug, Default)]
pub struct Form {
    fields: serde_json::Map<String, Value>,
    files: Vec<FilePart>,
}

/// One multipart file part.
#[derive(Clone, Debug)]
pub struct FilePart {
    pub name: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field; `None`-like values should simply not be added.
    pub fn field(mut self, name: &str, value: impl Serialize) -> Self {
        // Serialization of plain scalars and our own wire types cannot fail.
        if let Ok(value) = serde_json::to_value(value) {
            if !value.is_null() {
                self.fields.insert(name.to_string(), value);
            }
        }
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: Vec<u8>) -> Self {
        self.files.push(FilePart {
            name: name.to_string(),
            filename: filename.to_string(),
            bytes,
        });
        self
    }

    pub fn fields(&self) -> &serde_json::Map<String, Value> {
        &self.fields
    }

    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Async HTTP transport used by [`crate::api::Api`].
///
/// Implementations must be cheap to share (`Arc`-wrapped by the API handle).
#[async_trait]
pub trait Client: Send + Sync {
    /// POSTs the form and returns the decoded JSON document.
    async fn request_json(&self, url: &str, form: Form) -> Result<Value, ClientError>;

    /// POSTs the form and returns the raw body (file downloads).
    async fn request_bytes(&self, url: &str, form: Form) -> Result<Vec<u8>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Null field values are dropped instead of serialized.
    #[test]
    fn form_drops_null_fields() {
        let form = Form::new()
            .field("chat_id", 42)
            .field("thread_id", Option::<i64>::None);
        assert!(form.fields().contains_key("chat_id"));
        assert!(!form.fields().contains_key("thread_id"));
    }

    /// **Scenario**: Attaching a file switches the form into multipart mode.
    #[test]
    fn form_with_file_is_multipart() {
        let form = Form::new().field("chat_id", 1).file("document", "a.txt", b"hi".to_vec());
        assert!(form.has_files());
        assert_eq!(form.files()[0].filename, "a.txt");
    }
}
