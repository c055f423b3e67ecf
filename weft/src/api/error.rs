//! API-level errors: the upstream rejected a call, or the transport below
//! failed before an answer arrived.

use thiserror::Error;

use crate::client::ClientError;

/// Upstream rejection (`ok: false` envelope) or transport failure.
///
/// Delivered as a failed result to the caller; never thrown across the
/// dispatch pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api error {code}: {description}")]
    Api { code: i32, description: String },

    #[error(transparent)]
    Transport(#[from] ClientError),

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

impl ApiError {
    pub fn api(code: i32, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }

    /// Error code when the upstream rejected the call.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
