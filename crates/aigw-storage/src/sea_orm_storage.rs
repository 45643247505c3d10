use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseConnection, QueryOrder, QuerySelect, Schema, TransactionTrait};
use time::OffsetDateTime;

use aigw_common::Money;

use crate::db::connect_shared;
use crate::entities;
use crate::storage::{
    ApiKeyRow, JobProcessing, JobRow, JobTerminalUpdate, NewJob, NewJobAttempt, NewRequestLog,
    NewWebhookDelivery, Storage, StorageError, StorageResult,
};

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
}

impl SeaOrmStorage {
    pub async fn connect(dsn: &str) -> Result<Self, DbErr> {
        let db = connect_shared(dsn).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn api_key_from_model(model: entities::api_keys::Model) -> ApiKeyRow {
    ApiKeyRow {
        id: model.id,
        display_name: model.display_name,
        key_id: model.key_id,
        secret_hash: model.secret_hash,
        active: model.active,
        rpm_limit: model.rpm_limit,
        daily_budget: model.daily_budget,
        monthly_budget: model.monthly_budget,
        created_at: model.created_at,
    }
}

fn job_from_model(model: entities::jobs::Model) -> StorageResult<JobRow> {
    Ok(JobRow {
        id: model.id,
        api_key_id: model.api_key_id,
        kind: model.kind,
        provider: model.provider,
        model: model.model,
        status: model.status,
        redacted_payload: model.redacted_payload,
        webhook_url: model.webhook_url,
        webhook_secret: model.webhook_secret,
        webhook_headers: model.webhook_headers,
        redacted_result: model.redacted_result,
        error_code: model.error_code,
        error_message: model.error_message,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Shared by the plain (`&self.db`) and in-transaction (`&txn`) call sites —
/// `sea_orm::ConnectionTrait` is implemented by both.
async fn insert_request_log_conn(conn: &impl ConnectionTrait, row: NewRequestLog) -> StorageResult<()> {
    let active_model = entities::request_logs::ActiveModel {
        id: ActiveValue::NotSet,
        api_key_id: ActiveValue::Set(row.api_key_id),
        kind: ActiveValue::Set(row.kind),
        provider: ActiveValue::Set(row.provider),
        model: ActiveValue::Set(row.model),
        status: ActiveValue::Set(row.status),
        error_code: ActiveValue::Set(row.error_code),
        error_message: ActiveValue::Set(row.error_message),
        prompt_tokens: ActiveValue::Set(row.prompt_tokens),
        completion_tokens: ActiveValue::Set(row.completion_tokens),
        total_tokens: ActiveValue::Set(row.total_tokens),
        cost: ActiveValue::Set(row.cost),
        latency_ms: ActiveValue::Set(row.latency_ms),
        redacted_request: ActiveValue::Set(row.redacted_request),
        redacted_response: ActiveValue::Set(row.redacted_response),
        created_at: ActiveValue::Set(OffsetDateTime::now_utc()),
    };
    entities::RequestLogs::insert(active_model).exec(conn).await?;
    Ok(())
}

async fn next_attempt_ordinal_conn(conn: &impl ConnectionTrait, job_id: Uuid) -> StorageResult<i32> {
    let last = entities::JobAttempts::find()
        .filter(entities::job_attempts::Column::JobId.eq(job_id))
        .order_by_desc(entities::job_attempts::Column::AttemptNo)
        .one(conn)
        .await?;
    Ok(last.map(|row| row.attempt_no + 1).unwrap_or(1))
}

async fn insert_job_attempt_conn(conn: &impl ConnectionTrait, row: NewJobAttempt) -> StorageResult<()> {
    let active_model = entities::job_attempts::ActiveModel {
        id: ActiveValue::NotSet,
        job_id: ActiveValue::Set(row.job_id),
        attempt_no: ActiveValue::Set(row.attempt_no),
        status: ActiveValue::Set(row.status),
        error_message: ActiveValue::Set(row.error_message),
        latency_ms: ActiveValue::Set(row.latency_ms),
        created_at: ActiveValue::Set(OffsetDateTime::now_utc()),
    };
    entities::JobAttempts::insert(active_model).exec(conn).await?;
    Ok(())
}

async fn mark_job_terminal_conn(
    conn: &impl ConnectionTrait,
    id: Uuid,
    update: JobTerminalUpdate,
) -> StorageResult<()> {
    let model = entities::Jobs::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(StorageError::NotFound)?;
    let mut active_model: entities::jobs::ActiveModel = model.into();
    active_model.status = ActiveValue::Set(update.status);
    active_model.redacted_result = ActiveValue::Set(update.redacted_result);
    active_model.error_code = ActiveValue::Set(update.error_code);
    active_model.error_message = ActiveValue::Set(update.error_message);
    active_model.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
    active_model.update(conn).await?;
    Ok(())
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn sync(&self) -> StorageResult<()> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::ApiKeys)
            .register(entities::RequestLogs)
            .register(entities::Jobs)
            .register(entities::JobAttempts)
            .register(entities::WebhookDeliveries)
            .sync(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_api_key(&self, row: ApiKeyRow) -> StorageResult<()> {
        let active_model = entities::api_keys::ActiveModel {
            id: ActiveValue::Set(row.id),
            display_name: ActiveValue::Set(row.display_name),
            key_id: ActiveValue::Set(row.key_id),
            secret_hash: ActiveValue::Set(row.secret_hash),
            active: ActiveValue::Set(row.active),
            rpm_limit: ActiveValue::Set(row.rpm_limit),
            daily_budget: ActiveValue::Set(row.daily_budget),
            monthly_budget: ActiveValue::Set(row.monthly_budget),
            created_at: ActiveValue::Set(row.created_at),
        };
        entities::ApiKeys::insert(active_model).exec(&self.db).await?;
        Ok(())
    }

    async fn find_api_key_by_key_id(&self, key_id: &str) -> StorageResult<Option<ApiKeyRow>> {
        let found = entities::ApiKeys::find()
            .filter(entities::api_keys::Column::KeyId.eq(key_id))
            .filter(entities::api_keys::Column::Active.eq(true))
            .one(&self.db)
            .await?;
        Ok(found.map(api_key_from_model))
    }

    async fn list_active_legacy_keys(&self) -> StorageResult<Vec<ApiKeyRow>> {
        let rows = entities::ApiKeys::find()
            .filter(entities::api_keys::Column::KeyId.is_null())
            .filter(entities::api_keys::Column::Active.eq(true))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(api_key_from_model).collect())
    }

    async fn find_api_key_by_id(&self, id: Uuid) -> StorageResult<Option<ApiKeyRow>> {
        let found = entities::ApiKeys::find_by_id(id).one(&self.db).await?;
        Ok(found.map(api_key_from_model))
    }

    async fn set_api_key_active(&self, id: Uuid, active: bool) -> StorageResult<()> {
        let model = entities::ApiKeys::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        let mut active_model: entities::api_keys::ActiveModel = model.into();
        active_model.active = ActiveValue::Set(active);
        active_model.update(&self.db).await?;
        Ok(())
    }

    async fn insert_request_log(&self, row: NewRequestLog) -> StorageResult<()> {
        insert_request_log_conn(&self.db, row).await
    }

    async fn sum_succeeded_cost_since(
        &self,
        api_key_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Money> {
        let rows = entities::RequestLogs::find()
            .filter(entities::request_logs::Column::ApiKeyId.eq(api_key_id))
            .filter(entities::request_logs::Column::Status.eq("succeeded"))
            .filter(entities::request_logs::Column::CreatedAt.gte(since))
            .all(&self.db)
            .await?;
        let total = rows
            .into_iter()
            .filter_map(|row| row.cost)
            .fold(Money::ZERO, |acc, cost| acc + cost);
        Ok(total)
    }

    async fn find_job_by_idempotency_key(
        &self,
        api_key_id: Uuid,
        idempotency_key: &str,
    ) -> StorageResult<Option<JobRow>> {
        let found = entities::Jobs::find()
            .filter(entities::jobs::Column::ApiKeyId.eq(api_key_id))
            .filter(entities::jobs::Column::IdempotencyKey.eq(idempotency_key))
            .one(&self.db)
            .await?;
        found.map(job_from_model).transpose()
    }

    async fn insert_job_queued(&self, job: NewJob) -> StorageResult<()> {
        let now = OffsetDateTime::now_utc();
        let active_model = entities::jobs::ActiveModel {
            id: ActiveValue::Set(job.id),
            api_key_id: ActiveValue::Set(job.api_key_id),
            kind: ActiveValue::Set(job.kind),
            provider: ActiveValue::Set(job.provider),
            model: ActiveValue::Set(job.model),
            status: ActiveValue::Set("queued".to_string()),
            idempotency_key: ActiveValue::Set(job.idempotency_key),
            redacted_payload: ActiveValue::Set(job.redacted_payload),
            webhook_url: ActiveValue::Set(job.webhook_url),
            webhook_secret: ActiveValue::Set(job.webhook_secret),
            webhook_headers: ActiveValue::Set(job.webhook_headers),
            redacted_result: ActiveValue::Set(None),
            error_code: ActiveValue::Set(None),
            error_message: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        entities::Jobs::insert(active_model).exec(&self.db).await?;
        Ok(())
    }

    async fn find_job_for_owner(&self, id: Uuid, api_key_id: Uuid) -> StorageResult<Option<JobRow>> {
        let found = entities::Jobs::find_by_id(id)
            .filter(entities::jobs::Column::ApiKeyId.eq(api_key_id))
            .one(&self.db)
            .await?;
        found.map(job_from_model).transpose()
    }

    async fn begin_job_processing(&self, id: Uuid) -> StorageResult<Option<JobProcessing>> {
        let txn = self.db.begin().await?;

        let Some(model) = entities::Jobs::find_by_id(id).lock_exclusive().one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };
        let job = job_from_model(model)?;
        if job.status == "succeeded" || job.status == "failed" {
            txn.rollback().await?;
            return Ok(None);
        }

        let attempt_no = next_attempt_ordinal_conn(&txn, id).await?;

        let model = entities::Jobs::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StorageError::NotFound)?;
        let mut active_model: entities::jobs::ActiveModel = model.into();
        active_model.status = ActiveValue::Set("running".to_string());
        active_model.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        active_model.update(&txn).await?;

        Ok(Some(JobProcessing { job, attempt_no, txn }))
    }

    async fn finish_job_processing(
        &self,
        processing: JobProcessing,
        request_log: NewRequestLog,
        job_attempt: NewJobAttempt,
        terminal: JobTerminalUpdate,
    ) -> StorageResult<()> {
        let JobProcessing { job, txn, .. } = processing;

        insert_request_log_conn(&txn, request_log).await?;
        insert_job_attempt_conn(&txn, job_attempt).await?;
        mark_job_terminal_conn(&txn, job.id, terminal).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn insert_webhook_delivery(&self, row: NewWebhookDelivery) -> StorageResult<()> {
        let active_model = entities::webhook_deliveries::ActiveModel {
            id: ActiveValue::NotSet,
            job_id: ActiveValue::Set(row.job_id),
            attempt_no: ActiveValue::Set(row.attempt_no),
            target_url: ActiveValue::Set(row.target_url),
            http_status: ActiveValue::Set(row.http_status),
            error_message: ActiveValue::Set(row.error_message),
            latency_ms: ActiveValue::Set(row.latency_ms),
            created_at: ActiveValue::Set(OffsetDateTime::now_utc()),
        };
        entities::WebhookDeliveries::insert(active_model).exec(&self.db).await?;
        Ok(())
    }

    async fn next_delivery_ordinal(&self, job_id: Uuid) -> StorageResult<i32> {
        let last = entities::WebhookDeliveries::find()
            .filter(entities::webhook_deliveries::Column::JobId.eq(job_id))
            .order_by_desc(entities::webhook_deliveries::Column::AttemptNo)
            .one(&self.db)
            .await?;
        Ok(last.map(|row| row.attempt_no + 1).unwrap_or(1))
    }
}
