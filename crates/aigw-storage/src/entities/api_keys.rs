use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// `spec.md` §3: identity is an opaque UUID; `key_id` (the fingerprint half
/// of the presented `agw_<key_id>.<secret>` form) is unique when set. Legacy
/// keys carry no `key_id` and hash the whole presented token.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    #[sea_orm(unique)]
    pub key_id: Option<String>,
    pub secret_hash: String,
    pub active: bool,
    pub rpm_limit: Option<i32>,
    pub daily_budget: Option<Decimal>,
    pub monthly_budget: Option<Decimal>,
    pub created_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
