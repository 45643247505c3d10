use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use aigw_common::Money;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("db error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Row shape handed back to the Authenticator (`spec.md` §4.G). Holds the
/// hash, never the presented secret.
#[derive(Debug, Clone)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub display_name: String,
    pub key_id: Option<String>,
    pub secret_hash: String,
    pub active: bool,
    pub rpm_limit: Option<i32>,
    pub daily_budget: Option<Money>,
    pub monthly_budget: Option<Money>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewRequestLog {
    pub api_key_id: Uuid,
    pub kind: String,
    pub provider: String,
    pub model: Option<String>,
    pub status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub cost: Option<Money>,
    pub latency_ms: i64,
    pub redacted_request: serde_json::Value,
    pub redacted_response: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub kind: String,
    pub provider: String,
    pub model: Option<String>,
    pub idempotency_key: Option<String>,
    pub redacted_payload: serde_json::Value,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_headers: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub kind: String,
    pub provider: String,
    pub model: Option<String>,
    pub status: String,
    pub redacted_payload: serde_json::Value,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_headers: Option<serde_json::Value>,
    pub redacted_result: Option<serde_json::Value>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct JobTerminalUpdate {
    pub status: String,
    pub redacted_result: Option<serde_json::Value>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJobAttempt {
    pub job_id: Uuid,
    pub attempt_no: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub latency_ms: i64,
}

#[derive(Debug, Clone)]
pub struct NewWebhookDelivery {
    pub job_id: Uuid,
    pub attempt_no: i32,
    pub target_url: String,
    pub http_status: Option<i32>,
    pub error_message: Option<String>,
    pub latency_ms: i64,
}

/// A job locked for processing by `begin_job_processing`: the row's state at
/// lock time, its next attempt ordinal, and a transaction held open until
/// `finish_job_processing` commits it. Opaque outside `aigw-storage` — only
/// `SeaOrmStorage` can construct or consume the held transaction.
pub struct JobProcessing {
    pub job: JobRow,
    pub attempt_no: i32,
    pub(crate) txn: sea_orm::DatabaseTransaction,
}

/// Durable records: requests, jobs, attempts, deliveries (`spec.md` §4.K).
/// Reads used on the hot path (auth lookups, job-state fetch) hit this
/// directly — there is no separate in-memory snapshot layer in this gateway,
/// unlike the teacher's admin-config snapshot split, since every lookup here
/// is keyed and indexed rather than a small mutable config blob.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Entity-first schema sync (SeaORM 2.0).
    async fn sync(&self) -> StorageResult<()>;

    // --- ApiKey ---
    async fn insert_api_key(&self, row: ApiKeyRow) -> StorageResult<()>;
    async fn find_api_key_by_key_id(&self, key_id: &str) -> StorageResult<Option<ApiKeyRow>>;
    async fn list_active_legacy_keys(&self) -> StorageResult<Vec<ApiKeyRow>>;
    async fn find_api_key_by_id(&self, id: Uuid) -> StorageResult<Option<ApiKeyRow>>;
    async fn set_api_key_active(&self, id: Uuid, active: bool) -> StorageResult<()>;

    // --- RequestLog ---
    async fn insert_request_log(&self, row: NewRequestLog) -> StorageResult<()>;

    /// Sum of `cost` for `succeeded` rows owned by `api_key_id` with
    /// `created_at >= since` (`spec.md` §4.F).
    async fn sum_succeeded_cost_since(
        &self,
        api_key_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Money>;

    // --- Job ---
    async fn find_job_by_idempotency_key(
        &self,
        api_key_id: Uuid,
        idempotency_key: &str,
    ) -> StorageResult<Option<JobRow>>;
    async fn insert_job_queued(&self, job: NewJob) -> StorageResult<()>;
    async fn find_job_for_owner(&self, id: Uuid, api_key_id: Uuid) -> StorageResult<Option<JobRow>>;

    /// Worker-loop step 1 (`spec.md` §4.I): opens a transaction, takes
    /// `SELECT ... FOR UPDATE` on the job row, marks it `running`, and
    /// computes the next attempt ordinal — all inside the transaction. The
    /// lock is held across the provider call the caller makes next and is
    /// only released by `finish_job_processing`, so `queued -> running ->
    /// terminal` is one atomic transition (`spec.md` §9). Returns `None` if
    /// the job is missing or already terminal.
    async fn begin_job_processing(&self, id: Uuid) -> StorageResult<Option<JobProcessing>>;

    /// Worker-loop steps 2-4: writes the RequestLog and JobAttempt rows,
    /// marks the job terminal, and commits the transaction
    /// `begin_job_processing` opened.
    async fn finish_job_processing(
        &self,
        processing: JobProcessing,
        request_log: NewRequestLog,
        job_attempt: NewJobAttempt,
        terminal: JobTerminalUpdate,
    ) -> StorageResult<()>;

    // --- WebhookDelivery ---
    async fn insert_webhook_delivery(&self, row: NewWebhookDelivery) -> StorageResult<()>;

    /// `max(attempt_no) + 1` for this job's deliveries so far (`spec.md`
    /// §4.J step 2), distinct from the job's own attempt ordinal: a job
    /// succeeds on attempt 1 but its webhook can still take deliveries 1, 2,
    /// 3 before a receiver finally returns 2xx.
    async fn next_delivery_ordinal(&self, job_id: Uuid) -> StorageResult<i32>;
}
