use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// One record per terminated synchronous call or per job attempt's provider
/// call (`spec.md` §3). Immutable once written; indexed by
/// `(api_key_id, created_at)`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "request_logs")]
#[sea_orm(index(name = "idx_request_logs_key_created", columns = ["api_key_id", "created_at"]))]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub api_key_id: Uuid,
    #[sea_orm(belongs_to, from = "api_key_id", to = "id", on_delete = "Cascade")]
    pub api_key: HasOne<super::api_keys::Entity>,
    pub kind: String,
    pub provider: String,
    pub model: Option<String>,
    pub status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub cost: Option<Decimal>,
    pub latency_ms: i64,
    pub redacted_request: Json,
    pub redacted_response: Json,
    pub created_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
