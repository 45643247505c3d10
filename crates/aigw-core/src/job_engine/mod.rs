use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use aigw_common::RequestKind;
use aigw_storage::{JobRow, JobTerminalUpdate, NewJob, NewJobAttempt, NewRequestLog, Storage};

use crate::auth::AuthenticatedKey;
use crate::error::PublicError;
use crate::pipeline::invoke_provider;
use crate::state::AppState;
use crate::webhook_engine::WebhookMessage;

const MAX_INFRA_RETRIES: u32 = 3;

/// Webhook config attached to a job at creation time (`spec.md` §4.I).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSpec {
    pub url: String,
    pub secret: Option<String>,
    pub headers: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub kind: RequestKind,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub payload: Value,
    pub webhook: Option<WebhookSpec>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: String,
}

/// Message shape on the Redis job queue: the raw (unredacted) payload
/// travels only here, never through the `jobs` table (`spec.md` §4.I).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: Uuid,
    pub raw_payload: Value,
    #[serde(default)]
    pub retries: u32,
}

fn redact_for_storage(kind: RequestKind, payload: &Value) -> Value {
    match kind {
        RequestKind::ChatCompletions => aigw_redact::redact_chat_completions(payload),
        RequestKind::Responses | RequestKind::Models => aigw_redact::redact_responses(payload),
    }
}

/// `POST /v1/jobs` (`spec.md` §4.I "Create").
pub async fn create_job(
    state: &AppState,
    auth: &AuthenticatedKey,
    request: CreateJobRequest,
) -> Result<CreateJobResponse, PublicError> {
    state
        .rate_limiter
        .check(auth.api_key_id, "jobs.create", auth.rpm_limit)
        .await?;
    state
        .budget
        .admit(auth.api_key_id, auth.daily_budget, auth.monthly_budget)
        .await?;

    if let Some(idempotency_key) = &request.idempotency_key {
        if let Some(existing) = state
            .storage
            .find_job_by_idempotency_key(auth.api_key_id, idempotency_key)
            .await
            .map_err(|_| PublicError::invalid_request("idempotency lookup failed"))?
        {
            return Ok(CreateJobResponse {
                job_id: existing.id,
                status: existing.status,
            });
        }
    }

    let provider_name = request
        .provider
        .unwrap_or_else(|| state.default_provider.clone());
    let model = request
        .model
        .clone()
        .or_else(|| request.payload.get("model").and_then(Value::as_str).map(str::to_string));

    let job_id = Uuid::now_v7();
    let redacted_payload = redact_for_storage(request.kind, &request.payload);

    state
        .storage
        .insert_job_queued(NewJob {
            id: job_id,
            api_key_id: auth.api_key_id,
            kind: request.kind.endpoint_label().to_string(),
            provider: provider_name,
            model,
            idempotency_key: request.idempotency_key,
            redacted_payload,
            webhook_url: request.webhook.as_ref().map(|w| w.url.clone()),
            webhook_secret: request.webhook.as_ref().and_then(|w| w.secret.clone()),
            webhook_headers: request.webhook.as_ref().and_then(|w| w.headers.clone()),
        })
        .await
        .map_err(|_| PublicError::invalid_request("failed to persist job"))?;

    state
        .job_queue
        .push(&JobMessage {
            job_id,
            raw_payload: request.payload,
            retries: 0,
        })
        .await
        .map_err(|_| PublicError::invalid_request("failed to enqueue job"))?;

    Ok(CreateJobResponse {
        job_id,
        status: "queued".to_string(),
    })
}

/// `GET /v1/jobs/{id}` (`spec.md` §4.I "Read"). 404s on a key/job mismatch
/// rather than leaking existence.
pub async fn get_job(state: &AppState, auth: &AuthenticatedKey, job_id: Uuid) -> Result<JobRow, PublicError> {
    state
        .storage
        .find_job_for_owner(job_id, auth.api_key_id)
        .await
        .map_err(|_| PublicError::not_found())?
        .ok_or_else(PublicError::not_found)
}

/// One worker-loop iteration (`spec.md` §4.I "Worker loop"): blocks up to
/// `poll_timeout_secs` for a message, processes it fully, and acks. Returns
/// `true` if a message was processed, `false` on an empty poll.
pub async fn run_one_tick(state: &AppState, poll_timeout_secs: f64) -> anyhow::Result<bool> {
    let Some(raw) = state.job_queue.pop(poll_timeout_secs).await? else {
        return Ok(false);
    };
    let message: JobMessage = match crate::queue::RedisQueue::decode(&raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "dropping undecodable job message");
            state.job_queue.ack(&raw).await?;
            return Ok(true);
        }
    };

    match process_job(state, &message).await {
        Ok(()) => {
            state.job_queue.ack(&raw).await?;
        }
        Err(InfraFailure(reason)) => {
            if message.retries >= MAX_INFRA_RETRIES {
                warn!(job_id = %message.job_id, %reason, "job exceeded infra retry budget, dropping");
                state.job_queue.ack(&raw).await?;
            } else {
                let backoff = Duration::from_secs(2u64.saturating_pow(message.retries).min(60));
                warn!(job_id = %message.job_id, %reason, retries = message.retries, "requeueing job after infra failure");
                tokio::time::sleep(backoff).await;
                let retried = JobMessage {
                    retries: message.retries + 1,
                    ..message
                };
                state.job_queue.requeue(&raw, &retried).await?;
            }
        }
    }
    Ok(true)
}

struct InfraFailure(String);

async fn process_job(state: &AppState, message: &JobMessage) -> Result<(), InfraFailure> {
    let infra = |context: &str| move |e: aigw_storage::StorageError| InfraFailure(format!("{context}: {e}"));

    let Some(processing) = state
        .storage
        .begin_job_processing(message.job_id)
        .await
        .map_err(infra("lock"))?
    else {
        return Ok(());
    };
    let job = processing.job.clone();
    let attempt_no = processing.attempt_no;

    let kind = parse_kind(&job.kind);
    let provider = state.providers.get(&job.provider);

    let started = Instant::now();
    let outcome = match provider {
        Some(provider) => invoke_provider(provider.as_ref(), kind, &message.raw_payload).await,
        None => Err(aigw_provider_core::ProviderError::Other(format!(
            "unknown provider: {}",
            job.provider
        ))),
    };
    let latency_ms = started.elapsed().as_millis() as i64;

    let redacted_request = redact_for_storage(kind, &message.raw_payload);

    let (status_label, terminal, request_log, redacted_result) = match &outcome {
        Ok(result) => {
            let cost = job
                .model
                .as_deref()
                .and_then(|m| state.prices.cost(m, result.prompt_tokens, result.completion_tokens));
            let redacted_response = redact_for_storage(kind, &result.json);
            let summary = aigw_redact::redact_result_summary(&result.json);
            let redacted_result = serde_json::json!({
                "request_id": Uuid::now_v7().to_string(),
                "provider": job.provider,
                "model": job.model,
                "latency_ms": latency_ms,
                "tokens": {
                    "prompt": result.prompt_tokens,
                    "completion": result.completion_tokens,
                    "total": result.total_tokens,
                },
                "cost_rub": cost,
                "result": summary,
            });
            (
                "succeeded".to_string(),
                JobTerminalUpdate {
                    status: "succeeded".to_string(),
                    redacted_result: Some(redacted_result.clone()),
                    error_code: None,
                    error_message: None,
                },
                NewRequestLog {
                    api_key_id: job.api_key_id,
                    kind: job.kind.clone(),
                    provider: job.provider.clone(),
                    model: job.model.clone(),
                    status: "succeeded".to_string(),
                    error_code: None,
                    error_message: None,
                    prompt_tokens: result.prompt_tokens.map(|v| v as i64),
                    completion_tokens: result.completion_tokens.map(|v| v as i64),
                    total_tokens: result.total_tokens.map(|v| v as i64),
                    cost,
                    latency_ms,
                    redacted_request,
                    redacted_response,
                },
                redacted_result,
            )
        }
        Err(err) => {
            let mapped = PublicError::from_provider_error(err);
            let redacted_result = serde_json::json!({
                "request_id": Uuid::now_v7().to_string(),
                "provider": job.provider,
                "model": job.model,
                "latency_ms": latency_ms,
                "error": { "code": mapped.code, "message": mapped.message },
            });
            (
                "failed".to_string(),
                JobTerminalUpdate {
                    status: "failed".to_string(),
                    redacted_result: Some(redacted_result.clone()),
                    error_code: Some(mapped.code.to_string()),
                    error_message: Some(mapped.message.clone()),
                },
                NewRequestLog {
                    api_key_id: job.api_key_id,
                    kind: job.kind.clone(),
                    provider: job.provider.clone(),
                    model: job.model.clone(),
                    status: "failed".to_string(),
                    error_code: Some(mapped.code.to_string()),
                    error_message: Some(mapped.message.clone()),
                    prompt_tokens: None,
                    completion_tokens: None,
                    total_tokens: None,
                    cost: None,
                    latency_ms,
                    redacted_request,
                    redacted_response: mapped.to_envelope(),
                },
                redacted_result,
            )
        }
    };

    let job_attempt = NewJobAttempt {
        job_id: job.id,
        attempt_no,
        status: status_label.clone(),
        error_message: terminal.error_message.clone(),
        latency_ms,
    };
    state
        .storage
        .finish_job_processing(processing, request_log, job_attempt, terminal)
        .await
        .map_err(infra("finish job processing"))?;

    state
        .metrics
        .jobs_total
        .with_label_values(&[job.provider.as_str(), status_label.as_str()])
        .inc();

    if let Some(webhook_url) = &job.webhook_url {
        let message = WebhookMessage {
            job_id: job.id,
            attempt: attempt_no,
            target_url: webhook_url.clone(),
            secret: job.webhook_secret.clone(),
            headers: job.webhook_headers.clone(),
            body: serde_json::json!({
                "job_id": job.id,
                "status": status_label,
                "meta": {
                    "request_id": redacted_result.get("request_id"),
                    "provider": job.provider,
                    "model": job.model,
                    "latency_ms": latency_ms,
                    "cost_rub": redacted_result.get("cost_rub"),
                    "attempt": attempt_no,
                },
                "result": redacted_result.get("result"),
                "error": redacted_result.get("error"),
            }),
            retries: 0,
        };
        state.webhook_queue.push(&message).await.map_err(infra("enqueue webhook"))?;
    }

    Ok(())
}

fn parse_kind(raw: &str) -> RequestKind {
    match raw {
        "chat.completions" => RequestKind::ChatCompletions,
        "models" => RequestKind::Models,
        _ => RequestKind::Responses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_round_trips_known_labels() {
        assert_eq!(parse_kind("responses"), RequestKind::Responses);
        assert_eq!(parse_kind("chat.completions"), RequestKind::ChatCompletions);
        assert_eq!(parse_kind("models"), RequestKind::Models);
    }

    #[test]
    fn job_message_defaults_retries_to_zero_when_absent() {
        let decoded: JobMessage =
            serde_json::from_value(serde_json::json!({"job_id": Uuid::nil(), "raw_payload": {}})).unwrap();
        assert_eq!(decoded.retries, 0);
    }
}
