use time::OffsetDateTime;
use uuid::Uuid;

use aigw_common::Money;
use aigw_storage::{ApiKeyRow, Storage, StorageResult};

use crate::auth::hash_secret;

/// One-time presentation of a freshly provisioned key. The caller (an
/// external CLI/dashboard, out of scope per `spec.md` §1) must display
/// `token` to the operator now — it is never recoverable afterward, since
/// only its Argon2 hash is persisted.
pub struct ProvisionedKey {
    pub api_key_id: Uuid,
    pub token: String,
}

/// Named storage-level provisioning interface (`spec.md` §1 "CLI for key
/// provisioning" — named interface only, no interactive CLI tree here).
/// Generates a `key_id`/secret pair, hashes the secret, and persists the row.
pub async fn provision_api_key(
    storage: &impl Storage,
    display_name: String,
    rpm_limit: Option<i32>,
    daily_budget: Option<Money>,
    monthly_budget: Option<Money>,
) -> StorageResult<ProvisionedKey> {
    let api_key_id = Uuid::now_v7();
    let key_id = Uuid::now_v7().simple().to_string();
    let secret = Uuid::now_v7().to_string();
    let secret_hash = hash_secret(&secret).map_err(|_| aigw_storage::StorageError::Conflict("hash failed".to_string()))?;

    storage
        .insert_api_key(ApiKeyRow {
            id: api_key_id,
            display_name,
            key_id: Some(key_id.clone()),
            secret_hash,
            active: true,
            rpm_limit,
            daily_budget,
            monthly_budget,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    Ok(ProvisionedKey {
        api_key_id,
        token: format!("agw_{key_id}.{secret}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_format_matches_authenticator_expectations() {
        let token = format!("agw_{}.{}", "abc123", "secretvalue");
        assert!(token.starts_with("agw_"));
        assert_eq!(token.matches('.').count(), 1);
    }
}
