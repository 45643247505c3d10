//! Redaction: irreversibly strips user text from payloads and results before
//! they are allowed to reach the audit store. `spec.md` §4.B is explicit that
//! this must never emit user text — that invariant is exercised by the
//! `proptest` suite below rather than by example-based unit tests alone.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

const SENTINEL: &str = "<redacted>";

/// Keys whose string value (and any strings nested within it) must be
/// redacted when walking a `responses`-shaped payload (`spec.md` §4.B).
const RESPONSES_REDACT_KEYS: &[&str] = &["content", "input", "text", "instructions"];

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

fn redacted_string_node(original: &str) -> Value {
    json!({
        "redacted": true,
        "len": original.chars().count(),
        "sha256": sha256_hex(original.as_bytes()),
    })
}

/// Redact a `chat.completions`-shaped payload: every message `content`
/// string becomes the sentinel, plus `content_len` and a hex SHA-256 of the
/// original string.
pub fn redact_chat_completions(payload: &Value) -> Value {
    let mut out = payload.clone();
    if let Some(messages) = out.get_mut("messages").and_then(Value::as_array_mut) {
        for message in messages.iter_mut() {
            let Some(obj) = message.as_object_mut() else {
                continue;
            };
            if let Some(Value::String(content)) = obj.get("content") {
                let content_len = content.chars().count();
                let digest = sha256_hex(content.as_bytes());
                obj.insert("content".to_string(), Value::String(SENTINEL.to_string()));
                obj.insert("content_len".to_string(), json!(content_len));
                obj.insert("content_sha256".to_string(), json!(digest));
            }
        }
    }
    out
}

/// Redact a `responses`-shaped payload: recursively walk the structure,
/// replacing any string found at `{content, input, text, instructions}`
/// keys (including strings nested within those subtrees) with a
/// `{redacted, len, sha256}` node.
pub fn redact_responses(payload: &Value) -> Value {
    walk(payload, false)
}

fn walk(value: &Value, inside_redact_scope: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                let scoped = inside_redact_scope || RESPONSES_REDACT_KEYS.contains(&key.as_str());
                out.insert(key.clone(), walk(v, scoped));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| walk(item, inside_redact_scope)).collect())
        }
        Value::String(s) => {
            if inside_redact_scope {
                redacted_string_node(s)
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

/// Redact a provider result summary down to `{sha256, keys}`: a digest of a
/// deterministic string rendering plus the sorted top-level string keys.
/// `spec.md` §4.B: "store `{sha256 of a deterministic string rendering,
/// sorted top-level string keys}` only."
pub fn redact_result_summary(result: &Value) -> Value {
    let rendering = canonical_string(result);
    let mut keys: Vec<String> = match result {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| v.is_string())
            .map(|(k, _)| k.clone())
            .collect(),
        _ => Vec::new(),
    };
    keys.sort();
    json!({
        "sha256": sha256_hex(rendering.as_bytes()),
        "keys": keys,
    })
}

/// Deterministic string rendering of a JSON value: object keys sorted,
/// compact separators, no insertion-order dependence.
fn canonical_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .iter()
                .map(|(k, v)| format!("{:?}:{}", k, canonical_string(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        Value::Array(items) => {
            let body = items
                .iter()
                .map(canonical_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{body}]")
        }
        other => other.to_string(),
    }
}

/// Recursively collects every string literal present in a JSON value,
/// including object keys, used only by the fuzz test below to assert no
/// substring of user content survives redaction.
#[cfg(test)]
fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => {
            for (k, v) in map {
                out.push(k.clone());
                collect_strings(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn chat_completions_redacts_message_content() {
        let payload = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "my secret prompt"}]
        });
        let redacted = redact_chat_completions(&payload);
        let msg = &redacted["messages"][0];
        assert_eq!(msg["content"], json!("<redacted>"));
        assert_eq!(msg["content_len"], json!(17));
        assert!(msg["content_sha256"].is_string());
        assert_eq!(redacted["model"], json!("gpt-4o"));
    }

    #[test]
    fn responses_redacts_nested_strings_under_scoped_keys() {
        let payload = json!({
            "model": "gpt-4o",
            "input": [{"role": "user", "content": [{"type": "text", "text": "hello there"}]}],
            "instructions": "be nice"
        });
        let redacted = redact_responses(&payload);
        assert_eq!(redacted["model"], json!("gpt-4o"));
        let mut strings = Vec::new();
        collect_strings(&redacted["input"], &mut strings);
        assert!(!strings.contains(&"hello there".to_string()));
        assert!(redacted["instructions"]["redacted"] == json!(true));
    }

    #[test]
    fn result_summary_keeps_only_hash_and_sorted_keys() {
        let result = json!({"b": "two", "a": "one", "n": 3});
        let summary = redact_result_summary(&result);
        assert_eq!(summary["keys"], json!(["a", "b"]));
        assert!(summary["sha256"].is_string());
    }

    proptest! {
        #[test]
        fn redaction_never_leaks_user_text(secret in "[a-zA-Z0-9 ]{1,64}") {
            let payload = json!({
                "messages": [{"role": "user", "content": secret.clone()}]
            });
            let redacted = redact_chat_completions(&payload);
            let rendered = redacted.to_string();
            prop_assert!(!rendered.contains(&secret));

            let payload2 = json!({"input": secret.clone(), "other": {"text": secret.clone()}});
            let redacted2 = redact_responses(&payload2);
            let rendered2 = redacted2.to_string();
            prop_assert!(!rendered2.contains(&secret));

            let summary = redact_result_summary(&json!({"content": secret.clone()}));
            prop_assert!(!summary.to_string().contains(&secret));
        }
    }
}
