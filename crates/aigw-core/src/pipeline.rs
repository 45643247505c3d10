use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use aigw_common::{Money, RequestKind, TerminalStatus};
use aigw_provider_core::{Provider, ProviderOutcome};
use aigw_redact::{redact_chat_completions, redact_responses};
use aigw_storage::NewRequestLog;

use crate::auth::AuthenticatedKey;
use crate::error::PublicError;
use crate::models_cache::ModelsCache;
use crate::state::AppState;

/// Outcome of a sync endpoint call, ready to be serialized straight onto the
/// HTTP response (`spec.md` §4.H).
pub struct PipelineResponse {
    pub body: Value,
}

fn model_from_payload(payload: &Value) -> Option<String> {
    payload.get("model").and_then(Value::as_str).map(str::to_string)
}

fn redact_payload(kind: RequestKind, payload: &Value) -> Value {
    match kind {
        RequestKind::ChatCompletions => redact_chat_completions(payload),
        RequestKind::Responses | RequestKind::Models => redact_responses(payload),
    }
}

/// Resolve the provider name: header override wins over the process default
/// (`spec.md` §4.D/§4.H).
pub fn resolve_provider_name(header_override: Option<&str>, default_provider: &str) -> String {
    header_override
        .map(str::to_string)
        .unwrap_or_else(|| default_provider.to_string())
}

/// `POST /v1/responses` and `POST /v1/chat/completions` (`spec.md` §4.H).
pub async fn run_sync_call(
    state: &AppState,
    auth: &AuthenticatedKey,
    kind: RequestKind,
    provider_name: &str,
    payload: Value,
) -> Result<PipelineResponse, PublicError> {
    state
        .rate_limiter
        .check(auth.api_key_id, kind.endpoint_label(), auth.rpm_limit)
        .await?;
    state
        .budget
        .admit(auth.api_key_id, auth.daily_budget, auth.monthly_budget)
        .await?;

    let provider = state
        .providers
        .get(provider_name)
        .ok_or_else(|| PublicError::unknown_provider(provider_name))?;

    let model = model_from_payload(&payload);
    let started = Instant::now();
    let outcome = match kind {
        RequestKind::Responses => provider.responses(&payload).await,
        RequestKind::ChatCompletions => provider.chat_completions(&payload).await,
        RequestKind::Models => unreachable!("models routed through run_models_call"),
    };
    let latency_ms = started.elapsed().as_millis() as i64;

    let redacted_request = redact_payload(kind, &payload);

    let (status, public_err, response_json, prompt_tokens, completion_tokens, total_tokens, cost) =
        match &outcome {
            Ok(result) => {
                let cost = model
                    .as_deref()
                    .and_then(|m| state.prices.cost(m, result.prompt_tokens, result.completion_tokens));
                (
                    TerminalStatus::Succeeded,
                    None,
                    result.json.clone(),
                    result.prompt_tokens,
                    result.completion_tokens,
                    result.total_tokens,
                    cost,
                )
            }
            Err(err) => {
                let mapped = PublicError::from_provider_error(err);
                (
                    TerminalStatus::Failed,
                    Some(mapped.clone()),
                    mapped.to_envelope(),
                    None,
                    None,
                    None,
                    None,
                )
            }
        };
    let redacted_response = redact_payload(kind, &response_json);

    record_metrics(state, kind, provider_name, status, prompt_tokens, completion_tokens, model.as_deref(), cost, latency_ms);

    state
        .storage
        .insert_request_log(NewRequestLog {
            api_key_id: auth.api_key_id,
            kind: kind.endpoint_label().to_string(),
            provider: provider_name.to_string(),
            model: model.clone(),
            status: status_label(status).to_string(),
            error_code: public_err.as_ref().map(|e| e.code.to_string()),
            error_message: public_err.as_ref().map(|e| e.message.clone()),
            prompt_tokens: prompt_tokens.map(|v| v as i64),
            completion_tokens: completion_tokens.map(|v| v as i64),
            total_tokens: total_tokens.map(|v| v as i64),
            cost,
            latency_ms,
            redacted_request,
            redacted_response,
        })
        .await
        .map_err(|_| PublicError::invalid_request("failed to persist request log"))?;

    if let Some(err) = public_err {
        return Err(err);
    }

    let meta = serde_json::json!({
        "request_id": Uuid::now_v7().to_string(),
        "provider": provider_name,
        "latency_ms": latency_ms,
        "cost_rub": cost,
    });
    let mut body = response_json;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("meta".to_string(), meta);
    }
    Ok(PipelineResponse { body })
}

/// `GET /v1/models` — same auth/rate-limit gate as the other endpoints, plus
/// a read-through cache (`spec.md` §4.H).
pub async fn run_models_call(
    state: &AppState,
    auth: &AuthenticatedKey,
    provider_name: &str,
    base_url_for_cache_key: Option<&str>,
) -> Result<PipelineResponse, PublicError> {
    state
        .rate_limiter
        .check(auth.api_key_id, RequestKind::Models.endpoint_label(), auth.rpm_limit)
        .await?;

    let cache_key = ModelsCache::key(provider_name, base_url_for_cache_key);
    if let Some(cached) = state.models_cache.get(&cache_key) {
        let mut body = cached;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("meta".to_string(), serde_json::json!({ "cached": true }));
        }
        return Ok(PipelineResponse { body });
    }

    let provider = state
        .providers
        .get(provider_name)
        .ok_or_else(|| PublicError::unknown_provider(provider_name))?;

    let started = Instant::now();
    let result = provider.list_models().await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let (status, public_err, response_json) = match &result {
        Ok(json) => (TerminalStatus::Succeeded, None, json.clone()),
        Err(err) => {
            let mapped = PublicError::from_provider_error(err);
            (TerminalStatus::Failed, Some(mapped.clone()), mapped.to_envelope())
        }
    };

    record_metrics(state, RequestKind::Models, provider_name, status, None, None, None, None, latency_ms);

    state
        .storage
        .insert_request_log(NewRequestLog {
            api_key_id: auth.api_key_id,
            kind: RequestKind::Models.endpoint_label().to_string(),
            provider: provider_name.to_string(),
            model: None,
            status: status_label(status).to_string(),
            error_code: public_err.as_ref().map(|e| e.code.to_string()),
            error_message: public_err.as_ref().map(|e| e.message.clone()),
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            cost: None,
            latency_ms,
            redacted_request: serde_json::json!({}),
            redacted_response: response_json.clone(),
        })
        .await
        .map_err(|_| PublicError::invalid_request("failed to persist request log"))?;

    match result {
        Ok(json) => {
            state.models_cache.put(cache_key, json.clone());
            let mut body = json;
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "meta".to_string(),
                    serde_json::json!({ "cached": false, "provider": provider_name, "latency_ms": latency_ms }),
                );
            }
            Ok(PipelineResponse { body })
        }
        Err(_) => Err(public_err.expect("failed outcome always carries a mapped error")),
    }
}

#[allow(clippy::too_many_arguments)]
fn record_metrics(
    state: &AppState,
    kind: RequestKind,
    provider_name: &str,
    status: TerminalStatus,
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    model: Option<&str>,
    cost: Option<Money>,
    latency_ms: i64,
) {
    state
        .metrics
        .requests_total
        .with_label_values(&[kind.endpoint_label(), provider_name, status_label(status)])
        .inc();
    state
        .metrics
        .request_latency_seconds
        .with_label_values(&[kind.endpoint_label(), provider_name])
        .observe(latency_ms as f64 / 1000.0);
    let model = model.unwrap_or("unknown");
    if let Some(pt) = prompt_tokens {
        state
            .metrics
            .tokens_total
            .with_label_values(&[provider_name, model, "prompt"])
            .inc_by(pt as f64);
    }
    if let Some(ct) = completion_tokens {
        state
            .metrics
            .tokens_total
            .with_label_values(&[provider_name, model, "completion"])
            .inc_by(ct as f64);
    }
    if let Some(cost) = cost {
        use rust_decimal::prelude::ToPrimitive;
        state
            .metrics
            .cost_total
            .with_label_values(&[provider_name, model])
            .inc_by(cost.to_f64().unwrap_or(0.0));
    }
}

fn status_label(status: TerminalStatus) -> &'static str {
    match status {
        TerminalStatus::Succeeded => "succeeded",
        TerminalStatus::Failed => "failed",
    }
}

/// Outcome shape re-exported for the job engine, which reuses the same
/// provider dispatch but writes into a Job rather than an HTTP response.
pub async fn invoke_provider(
    provider: &dyn Provider,
    kind: RequestKind,
    payload: &Value,
) -> aigw_provider_core::ProviderResult<ProviderOutcome> {
    match kind {
        RequestKind::Responses => provider.responses(payload).await,
        RequestKind::ChatCompletions => provider.chat_completions(payload).await,
        RequestKind::Models => {
            let json = provider.list_models().await?;
            Ok(ProviderOutcome {
                json,
                prompt_tokens: None,
                completion_tokens: None,
                total_tokens: None,
            })
        }
    }
}
