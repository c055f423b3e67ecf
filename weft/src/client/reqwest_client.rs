//! Production transport over `reqwest`.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{Client, ClientError, Form};

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    http: reqwest::Client,
}

impl ReqwestClient {
    /// Client with the default per-request deadline (see [`crate::settings::Settings`]).
    pub fn new(http_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    fn build_request(&self, url: &str, form: Form) -> reqwest::RequestBuilder {
        if form.has_files() {
            let mut multipart = reqwest::multipart::Form::new();
            for (name, value) in form.fields() {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                multipart = multipart.text(name.clone(), text);
            }
            for part in form.files() {
                multipart = multipart.part(
                    part.name.clone(),
                    reqwest::multipart::Part::bytes(part.bytes.clone())
                        .file_name(part.filename.clone()),
                );
            }
            self.http.post(url).multipart(multipart)
        } else {
            self.http.post(url).json(form.fields())
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl Client for ReqwestClient {
    async fn request_json(&self, url: &str, form: Form) -> Result<Value, ClientError> {
        let response = self.build_request(url, form).send().await?;
        Ok(response.json().await?)
    }

    async fn request_bytes(&self, url: &str, form: Form) -> Result<Vec<u8>, ClientError> {
        let response = self.build_request(url, form).send().await?;
        Ok(response.bytes().await?.to_vec())
    }
}
