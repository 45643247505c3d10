use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Per-delivery record under a `Job` (`spec.md` §3). `http_status` is
/// nullable on transport failure.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webhook_deliveries")]
#[sea_orm(index(name = "idx_webhook_deliveries_job_created", columns = ["job_id", "created_at"]))]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub job_id: Uuid,
    #[sea_orm(belongs_to, from = "job_id", to = "id", on_delete = "Cascade")]
    pub job: HasOne<super::jobs::Entity>,
    pub attempt_no: i32,
    pub target_url: String,
    pub http_status: Option<i32>,
    pub error_message: Option<String>,
    pub latency_ms: i64,
    pub created_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
