//! Credential redaction for recorded provider payloads.

use serde_json::Value;

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments that mark a value as sensitive, matched case-insensitively.
const SENSITIVE_KEYS: [&str; 5] = ["api_key", "apikey", "token", "secret", "password"];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

/// Copy of `value` with every sensitive key's value replaced by [`REDACTED`].
///
/// Walks nested objects and arrays. Token *counts* live under `usage`,
/// whose keys (`prompt_tokens`, ...) also contain `token`, so `usage` is
/// kept as is.
pub fn sanitize_response(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if k == "usage" {
                        v.clone()
                    } else if is_sensitive(k) {
                        Value::String(REDACTED.to_owned())
                    } else {
                        sanitize_response(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_response).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_nested_keys() {
        let raw = json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"content": "hi", "apiKey": "sk-1"}}],
            "meta": {"Session_Token": "abc", "client_secret": {"x": 1}, "password": null}
        });
        let clean = sanitize_response(&raw);
        assert_eq!(clean["id"], "chatcmpl-1");
        assert_eq!(clean["choices"][0]["message"]["content"], "hi");
        assert_eq!(clean["choices"][0]["message"]["apiKey"], REDACTED);
        assert_eq!(clean["meta"]["Session_Token"], REDACTED);
        assert_eq!(clean["meta"]["client_secret"], REDACTED);
        assert_eq!(clean["meta"]["password"], REDACTED);
    }

    #[test]
    fn usage_counts_survive() {
        let raw = json!({"usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}});
        assert_eq!(sanitize_response(&raw), raw);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize_response(&json!("token")), json!("token"));
        assert_eq!(sanitize_response(&json!([1, 2])), json!([1, 2]));
    }
}
