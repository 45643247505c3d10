use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// `spec.md` §3: mutated only by the Job Engine under row-level lock.
/// Uniqueness on `(api_key_id, idempotency_key)` when the key is present;
/// once `status` is terminal it never changes and `updated_at` only
/// increases.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
#[sea_orm(index(
    name = "idx_jobs_key_idempotency",
    columns = ["api_key_id", "idempotency_key"],
    unique
))]
#[sea_orm(index(name = "idx_jobs_status_created", columns = ["status", "created_at"]))]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub api_key_id: Uuid,
    #[sea_orm(belongs_to, from = "api_key_id", to = "id", on_delete = "Cascade")]
    pub api_key: HasOne<super::api_keys::Entity>,
    pub kind: String,
    pub provider: String,
    pub model: Option<String>,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub redacted_payload: Json,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_headers: Option<Json>,
    pub redacted_result: Option<Json>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
