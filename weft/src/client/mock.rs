//! Scripted transport for tests: queued responses, recorded requests.
//!
//! Same role as the mock implementations behind the other client seams in
//! this workspace: deterministic, no network, inspectable after the run.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Client, ClientError, Form};

type Responder = dyn Fn(&str, &Form) -> Value + Send + Sync;

/// One request seen by the mock, in arrival order.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub url: String,
    pub fields: serde_json::Map<String, Value>,
}

impl RecordedRequest {
    /// Trailing path segment of the URL, i.e. the API method name.
    pub fn method(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// In-memory [`Client`]: pops queued responses first, then falls back to a
/// responder closure (default `{"ok": true, "result": true}`).
#[derive(Clone)]
pub struct MockClient {
    queue: Arc<Mutex<VecDeque<Value>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(|_, _| serde_json::json!({"ok": true, "result": true})),
        }
    }

    /// Replaces the fallback responder used when the queue is empty.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str, &Form) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.responder = Arc::new(responder);
        self
    }

    /// Queues one response; queued responses are served in FIFO order.
    pub fn push_response(&self, response: Value) {
        self.queue.lock().expect("mock queue poisoned").push_back(response);
    }

    /// Snapshot of every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock requests poisoned").clone()
    }

    /// Requests whose URL ends with the given API method name.
    pub fn requests_for(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method() == method)
            .collect()
    }

    fn respond(&self, url: &str, form: &Form) -> Value {
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .push(RecordedRequest {
                url: url.to_string(),
                fields: form.fields().clone(),
            });
        if let Some(queued) = self.queue.lock().expect("mock queue poisoned").pop_front() {
            queued
        } else {
            (self.responder)(url, form)
        }
    }
}

#[async_trait]
impl Client for MockClient {
    async fn request_json(&self, url: &str, form: Form) -> Result<Value, ClientError> {
        Ok(self.respond(url, &form))
    }

    async fn request_bytes(&self, url: &str, form: Form) -> Result<Vec<u8>, ClientError> {
        let value = self.respond(url, &form);
        serde_json::to_vec(&value).map_err(ClientError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Queued responses are served before the fallback responder.
    #[tokio::test]
    async fn queue_before_fallback() {
        let client = MockClient::new();
        client.push_response(serde_json::json!({"ok": true, "result": 7}));
        let first = client
            .request_json("https://host/botT/getMe", Form::new())
            .await
            .unwrap();
        let second = client
            .request_json("https://host/botT/getMe", Form::new())
            .await
            .unwrap();
        assert_eq!(first["result"], 7);
        assert_eq!(second["result"], true);
    }

    /// **Scenario**: Requests are recorded with their method name and fields.
    #[tokio::test]
    async fn records_method_and_fields() {
        let client = MockClient::new();
        let _ = client
            .request_json(
                "https://host/botT/sendMessage",
                Form::new().field("chat_id", 5).field("text", "Hi"),
            )
            .await;
        let sends = client.requests_for("sendMessage");
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].fields["text"], "Hi");
    }
}
