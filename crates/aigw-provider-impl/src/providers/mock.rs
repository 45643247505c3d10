use async_trait::async_trait;
use serde_json::{Value, json};

use aigw_provider_core::{Provider, ProviderOutcome, ProviderResult};

/// Synthesizes deterministic responses for local development and tests.
/// Token counts derive from text length: `max(1, len(text)/4)` (`spec.md`
/// §4.D).
#[derive(Debug, Default)]
pub struct MockProvider;

fn approx_tokens(text: &str) -> u64 {
    std::cmp::max(1, text.chars().count() as u64 / 4)
}

fn extract_prompt_text(payload: &Value) -> String {
    if let Some(input) = payload.get("input").and_then(Value::as_str) {
        return input.to_string();
    }
    if let Some(messages) = payload.get("messages").and_then(Value::as_array) {
        return messages
            .iter()
            .filter_map(|m| m.get("content").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ");
    }
    String::new()
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn responses(&self, payload: &Value) -> ProviderResult<ProviderOutcome> {
        let prompt_text = extract_prompt_text(payload);
        let prompt_tokens = approx_tokens(&prompt_text);
        let completion_text = format!("mock response to: {prompt_text}");
        let completion_tokens = approx_tokens(&completion_text);
        let json = json!({
            "id": "mock-resp",
            "object": "response",
            "model": payload.get("model").cloned().unwrap_or(Value::Null),
            "output_text": completion_text,
        });
        Ok(ProviderOutcome {
            json,
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens + completion_tokens),
        })
    }

    async fn chat_completions(&self, payload: &Value) -> ProviderResult<ProviderOutcome> {
        let prompt_text = extract_prompt_text(payload);
        let prompt_tokens = approx_tokens(&prompt_text);
        let completion_text = format!("[mock] ok: {prompt_text}");
        let completion_tokens = approx_tokens(&completion_text);
        let json = json!({
            "id": "mock-chatcmpl",
            "object": "chat.completion",
            "model": payload.get("model").cloned().unwrap_or(Value::Null),
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": completion_text},
                "finish_reason": "stop",
            }],
        });
        Ok(ProviderOutcome {
            json,
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens + completion_tokens),
        })
    }

    async fn list_models(&self) -> ProviderResult<Value> {
        Ok(json!({
            "object": "list",
            "data": [
                {"id": "mock-small", "object": "model"},
                {"id": "mock-large", "object": "model"},
            ],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_derives_token_counts_from_text_length() {
        let provider = MockProvider;
        let payload = json!({"model": "mock-small", "input": "hi there"});
        let outcome = provider.responses(&payload).await.unwrap();
        assert_eq!(outcome.prompt_tokens, Some(2));
        assert!(outcome.completion_tokens.unwrap() >= 1);
    }

    #[tokio::test]
    async fn chat_completions_reply_carries_the_mock_marker() {
        let provider = MockProvider;
        let payload = json!({"model": "mock-1", "messages": [{"role": "user", "content": "hi"}]});
        let outcome = provider.chat_completions(&payload).await.unwrap();
        assert_eq!(outcome.prompt_tokens, Some(1));
        let content = outcome.json["choices"][0]["message"]["content"].as_str().unwrap();
        assert!(content.starts_with("[mock] ok:"));
    }

    #[tokio::test]
    async fn empty_prompt_still_reports_minimum_one_token() {
        let provider = MockProvider;
        let payload = json!({"model": "mock-small", "input": ""});
        let outcome = provider.responses(&payload).await.unwrap();
        assert_eq!(outcome.prompt_tokens, Some(1));
    }

    #[tokio::test]
    async fn list_models_is_deterministic() {
        let provider = MockProvider;
        let a = provider.list_models().await.unwrap();
        let b = provider.list_models().await.unwrap();
        assert_eq!(a, b);
    }
}
