use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Per-try record under a `Job` (`spec.md` §3). Attempt ordinals are unique
/// and contiguous (1-based) per job.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "job_attempts")]
#[sea_orm(index(
    name = "idx_job_attempts_job_ordinal",
    columns = ["job_id", "attempt_no"],
    unique
))]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub job_id: Uuid,
    #[sea_orm(belongs_to, from = "job_id", to = "id", on_delete = "Cascade")]
    pub job: HasOne<super::jobs::Entity>,
    pub attempt_no: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub latency_ms: i64,
    pub created_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
