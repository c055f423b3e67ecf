//! The `{ ok, result | error_code, description }` response envelope.

use serde::Deserialize;

use super::ApiError;

/// Decoded upstream envelope; `into_result` resolves it to the payload or
/// an [`ApiError`].
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.ok {
            match self.result {
                Some(result) => Ok(result),
                None => Err(ApiError::api(500, "ok response without result")),
            }
        } else {
            Err(ApiError::api(
                self.error_code.unwrap_or(400),
                self.description.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: An ok envelope yields the result payload.
    #[test]
    fn ok_envelope() {
        let response: ApiResponse<i64> =
            serde_json::from_value(serde_json::json!({"ok": true, "result": 5})).unwrap();
        assert_eq!(response.into_result().unwrap(), 5);
    }

    /// **Scenario**: A failure envelope yields code and description.
    #[test]
    fn error_envelope() {
        let response: ApiResponse<i64> = serde_json::from_value(
            serde_json::json!({"ok": false, "error_code": 429, "description": "Too Many Requests"}),
        )
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code(), Some(429));
    }
}
