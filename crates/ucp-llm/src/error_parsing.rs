//! Error bodies from OpenAI-compatible endpoints.
//!
//! Servers in this family disagree on the envelope:
//! - `{"error": {"message": "...", "type": "...", "code": "..."}}`
//! - `{"error": "..."}` (several local model servers)
//! - `{"detail": "..."}` or `{"message": "...", "code": "..."}`

use serde_json::Value;

use crate::errors::ProviderError;

/// Parsed error response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// Human-readable message.
    pub message: String,
    /// Provider error code or type.
    pub code: Option<String>,
    /// Whether the request could be retried (429 or 5xx).
    pub retryable: bool,
}

impl ApiErrorInfo {
    /// Convert into a [`ProviderError::Api`].
    pub fn into_error(self, status: u16) -> ProviderError {
        ProviderError::Api {
            status,
            message: self.message,
            code: self.code,
            retryable: self.retryable,
        }
    }
}

fn code_of(obj: &Value) -> Option<String> {
    ["code", "type"]
        .iter()
        .find_map(|k| match &obj[*k] {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Parse a non-2xx body, falling back to the raw text.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let retryable = status == 429 || status >= 500;
    let raw = || format!("HTTP {status}: {}", body.trim());

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return ApiErrorInfo {
            message: raw(),
            code: None,
            retryable,
        };
    };

    let (message, code) = match &json["error"] {
        Value::Object(_) => (json["error"]["message"].as_str(), code_of(&json["error"])),
        Value::String(s) => (Some(s.as_str()), code_of(&json)),
        _ => (
            json["detail"].as_str().or_else(|| json["message"].as_str()),
            code_of(&json),
        ),
    };

    ApiErrorInfo {
        message: message.map_or_else(raw, str::to_owned),
        code,
        retryable,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_envelope() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let info = parse_api_error(body, 401);
        assert_eq!(info.message, "Incorrect API key provided");
        assert_eq!(info.code.as_deref(), Some("invalid_api_key"));
        assert!(!info.retryable);
    }

    #[test]
    fn string_error() {
        let info = parse_api_error(r#"{"error":"model 'llama' not found"}"#, 404);
        assert_eq!(info.message, "model 'llama' not found");
        assert_eq!(info.code, None);
    }

    #[test]
    fn detail_and_flat_message() {
        assert_eq!(parse_api_error(r#"{"detail":"Not Found"}"#, 404).message, "Not Found");
        let info = parse_api_error(r#"{"message":"busy","code":503}"#, 503);
        assert_eq!(info.message, "busy");
        assert_eq!(info.code.as_deref(), Some("503"));
        assert!(info.retryable);
    }

    #[test]
    fn unrecognized_json_and_plain_text() {
        assert_eq!(parse_api_error(r#"{"foo":1}"#, 500).message, r#"HTTP 500: {"foo":1}"#);
        let info = parse_api_error("Bad Gateway\n", 502);
        assert_eq!(info.message, "HTTP 502: Bad Gateway");
        assert!(info.retryable);
    }

    #[test]
    fn rate_limit_is_retryable() {
        assert!(parse_api_error("", 429).retryable);
    }
}
