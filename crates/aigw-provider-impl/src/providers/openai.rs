use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use aigw_provider_core::{Provider, ProviderError, ProviderOutcome, ProviderResult, RetryPolicy};

use super::http_client::client_for_provider;

/// Static configuration for one OpenAI-compatible upstream. Constructed once
/// at bootstrap from credential/config storage and held inside the provider
/// instance the per-process cache returns.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub retry: RetryPolicy,
}

impl OpenAiConfig {
    /// Strip a trailing `/` and a trailing `/v1` (`spec.md` §4.D).
    fn normalized_base(&self) -> String {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        if let Some(stripped) = base.strip_suffix("/v1") {
            base = stripped.to_string();
        }
        base
    }
}

#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.normalized_base(), path)
    }

    fn apply_request_headers(&self, mut builder: wreq::RequestBuilder) -> wreq::RequestBuilder {
        builder = builder.bearer_auth(&self.config.api_key);
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            // Title may contain non-ASCII; wreq/http header values require
            // percent-free bytes so we send the raw UTF-8 bytes and let the
            // HTTP layer reject anything it can't transmit.
            builder = builder.header("X-Title", title.as_bytes());
        }
        builder
    }

    async fn post_with_retry(&self, path: &str, payload: &Value) -> ProviderResult<Value> {
        let client = client_for_provider(&self.config.name)?;
        let url = self.endpoint(path);
        let mut attempt: u32 = 0;
        loop {
            let request = self.apply_request_headers(client.post(&url)).json(payload);
            let result = request.send().await;
            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status < 300 {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|err| ProviderError::Other(err.to_string()));
                    }
                    let body = response.text().await.unwrap_or_default();
                    let err = ProviderError::Upstream { status, body };
                    if !err.is_retryable() || attempt + 1 >= self.config.retry.max_attempts {
                        return Err(err);
                    }
                    warn!(provider = %self.config.name, status, attempt, "retrying upstream call");
                }
                Err(transport_err) => {
                    let err = ProviderError::Transport {
                        message: transport_err.to_string(),
                    };
                    if attempt + 1 >= self.config.retry.max_attempts {
                        return Err(err);
                    }
                    warn!(provider = %self.config.name, attempt, "retrying after transport error");
                }
            }
            tokio::time::sleep(self.config.retry.backoff(attempt)).await;
            attempt += 1;
        }
    }

    fn outcome_from_json(json: Value) -> ProviderOutcome {
        let usage = json.get("usage");
        let prompt_tokens = usage
            .and_then(|u| u.get("prompt_tokens").or_else(|| u.get("input_tokens")))
            .and_then(Value::as_u64);
        let completion_tokens = usage
            .and_then(|u| u.get("completion_tokens").or_else(|| u.get("output_tokens")))
            .and_then(Value::as_u64);
        let total_tokens = usage.and_then(|u| u.get("total_tokens")).and_then(Value::as_u64);
        ProviderOutcome {
            json,
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn responses(&self, payload: &Value) -> ProviderResult<ProviderOutcome> {
        let mut body = payload.clone();
        if let Some(obj) = body.as_object_mut() {
            obj.entry("store").or_insert(Value::Bool(false));
        }
        let json = self.post_with_retry("/responses", &body).await?;
        Ok(Self::outcome_from_json(json))
    }

    async fn chat_completions(&self, payload: &Value) -> ProviderResult<ProviderOutcome> {
        let json = self.post_with_retry("/chat/completions", payload).await?;
        Ok(Self::outcome_from_json(json))
    }

    async fn list_models(&self) -> ProviderResult<Value> {
        let client = client_for_provider(&self.config.name)?;
        let url = self.endpoint("/models");
        let response = self
            .apply_request_headers(client.get(&url))
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                message: err.to_string(),
            })?;
        let status = response.status().as_u16();
        if status >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream { status, body });
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| ProviderError::Other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OpenAiConfig {
        OpenAiConfig {
            name: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            api_key: "sk-test".to_string(),
            referer: None,
            title: None,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn base_url_strips_trailing_slash_and_v1() {
        let provider = OpenAiProvider::new(config());
        assert_eq!(provider.endpoint("/models"), "https://openrouter.ai/api/v1/models");
    }

    #[test]
    fn base_url_without_v1_suffix_is_unchanged() {
        let mut cfg = config();
        cfg.base_url = "https://api.example.com".to_string();
        let provider = OpenAiProvider::new(cfg);
        assert_eq!(provider.endpoint("/responses"), "https://api.example.com/v1/responses");
    }

    #[test]
    fn outcome_reads_usage_from_either_naming_convention() {
        let json = serde_json::json!({"usage": {"input_tokens": 5, "output_tokens": 7}});
        let outcome = OpenAiProvider::outcome_from_json(json);
        assert_eq!(outcome.prompt_tokens, Some(5));
        assert_eq!(outcome.completion_tokens, Some(7));
    }
}
