use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use aigw_storage::{NewWebhookDelivery, Storage};

use crate::state::AppState;

const MAX_RETRIES: u32 = 5;

/// Message on the webhook delivery queue, enqueued by the job engine once a
/// Job reaches a terminal state (`spec.md` §4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub job_id: Uuid,
    pub attempt: i32,
    pub target_url: String,
    pub secret: Option<String>,
    pub headers: Option<Value>,
    pub body: Value,
    #[serde(default)]
    pub retries: u32,
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || (500..600).contains(&status)
}

fn sign(secret: &str, body: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// One worker-loop iteration over the webhook queue. Returns `true` if a
/// message was processed.
pub async fn run_one_tick(state: &AppState, poll_timeout_secs: f64) -> anyhow::Result<bool> {
    let Some(raw) = state.webhook_queue.pop(poll_timeout_secs).await? else {
        return Ok(false);
    };
    let message: WebhookMessage = match crate::queue::RedisQueue::decode(&raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "dropping undecodable webhook message");
            state.webhook_queue.ack(&raw).await?;
            return Ok(true);
        }
    };

    let outcome = deliver(state, &message).await;
    match outcome {
        Delivered::Ok | Delivered::PermanentFailure => {
            state.webhook_queue.ack(&raw).await?;
        }
        Delivered::RetryableFailure => {
            if message.retries >= MAX_RETRIES {
                warn!(job_id = %message.job_id, "webhook exceeded retry budget, dropping");
                state.webhook_queue.ack(&raw).await?;
            } else {
                let backoff = Duration::from_secs(2u64.saturating_pow(message.retries).min(300));
                tokio::time::sleep(backoff).await;
                let retried = WebhookMessage {
                    retries: message.retries + 1,
                    ..message
                };
                state.webhook_queue.requeue(&raw, &retried).await?;
            }
        }
    }
    Ok(true)
}

enum Delivered {
    Ok,
    RetryableFailure,
    PermanentFailure,
}

/// `spec.md` §4.J steps 1-6. Step 1 ("reload the Job; discard if missing or
/// `webhook_url` absent") is a no-op here since the job engine only enqueues
/// a delivery when it already observed a `webhook_url`.
async fn deliver(state: &AppState, message: &WebhookMessage) -> Delivered {
    let body_bytes = match serde_json::to_vec(&message.body) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to serialize webhook body");
            return Delivered::PermanentFailure;
        }
    };

    let client = match wreq::Client::builder().build() {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build webhook client");
            return Delivered::RetryableFailure;
        }
    };

    let mut request = client
        .post(&message.target_url)
        .timeout(state.webhook_timeout)
        .header("content-type", "application/json; charset=utf-8");

    if let Some(Value::Object(headers)) = &message.headers {
        for (key, value) in headers {
            if let Some(value) = value.as_str() {
                request = request.header(key.as_str(), value);
            }
        }
    }
    if let Some(secret) = &message.secret {
        request = request.header("x-ai-gateway-signature", sign(secret, &body_bytes));
    }

    let started = Instant::now();
    let response = request.body(body_bytes).send().await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let (http_status, error_message, outcome) = match response {
        Ok(response) => {
            let status = response.status().as_u16();
            if (200..300).contains(&status) {
                (Some(status as i32), None, Delivered::Ok)
            } else if is_retryable_status(status) {
                (Some(status as i32), Some(format!("retryable status {status}")), Delivered::RetryableFailure)
            } else {
                (Some(status as i32), Some(format!("non-retryable status {status}")), Delivered::PermanentFailure)
            }
        }
        Err(err) => (None, Some(err.to_string()), Delivered::RetryableFailure),
    };

    state
        .metrics
        .webhook_deliveries_total
        .with_label_values(&[match outcome {
            Delivered::Ok => "ok",
            _ => "failed",
        }])
        .inc();

    let record = match state.storage.next_delivery_ordinal(message.job_id).await {
        Ok(attempt_no) => {
            state
                .storage
                .insert_webhook_delivery(NewWebhookDelivery {
                    job_id: message.job_id,
                    attempt_no,
                    target_url: message.target_url.clone(),
                    http_status,
                    error_message,
                    latency_ms,
                })
                .await
        }
        Err(err) => Err(err),
    };
    if let Err(err) = record {
        warn!(error = %err, job_id = %message.job_id, "failed to record webhook delivery");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_hex_sha256_prefixed() {
        let sig = sign("topsecret", b"{\"a\":1}");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
    }

    #[test]
    fn retryable_statuses_match_spec_set() {
        for status in [408, 409, 425, 429, 500, 503] {
            assert!(is_retryable_status(status));
        }
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
    }
}
