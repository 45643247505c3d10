use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ProviderResult;

/// Normalized result of a successful provider call (`spec.md` §4.D):
/// `{json, prompt_tokens?, completion_tokens?, total_tokens?}`.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub json: Value,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Uniform interface over mock and OpenAI-compatible upstreams
/// (`spec.md` §4.D). Three operations only; no streaming, no protocol
/// transforms — the sync pipeline and job engine are the only callers.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn responses(&self, payload: &Value) -> ProviderResult<ProviderOutcome>;

    async fn chat_completions(&self, payload: &Value) -> ProviderResult<ProviderOutcome>;

    async fn list_models(&self) -> ProviderResult<Value>;
}
