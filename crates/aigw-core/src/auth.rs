use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use aigw_common::Money;
use aigw_storage::{ApiKeyRow, Storage, StorageError};

use crate::error::PublicError;

const PRESENTED_PREFIX: &str = "agw_";

#[derive(Debug, Clone)]
pub struct AuthenticatedKey {
    pub api_key_id: Uuid,
    pub rpm_limit: Option<i32>,
    pub daily_budget: Option<Money>,
    pub monthly_budget: Option<Money>,
}

/// Splits a presented `X-API-Key` value into `(key_id, secret)` per
/// `spec.md` §4.G: split on the first `.`; if the prefix starts with
/// `agw_`, strip it; if both halves are nonempty that's the "new form",
/// otherwise fall back to the legacy whole-token form.
fn parse_presented_key(presented: &str) -> (Option<&str>, &str) {
    let Some((prefix, secret)) = presented.split_once('.') else {
        return (None, presented);
    };
    let key_id = prefix.strip_prefix(PRESENTED_PREFIX).unwrap_or(prefix);
    if !key_id.is_empty() && !secret.is_empty() {
        (Some(key_id), secret)
    } else {
        (None, presented)
    }
}

fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok()
}

/// One-way hash of a secret with a fresh per-hash salt (`spec.md` §3).
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

pub struct Authenticator<S> {
    storage: Arc<S>,
}

impl<S: Storage> Authenticator<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Validate a presented key. On success, returns the caps needed by the
    /// rate limiter and budget enforcer. On failure, a constant HTTP 401
    /// message regardless of cause (`spec.md` §4.G).
    pub async fn authenticate(&self, presented: &str) -> Result<AuthenticatedKey, PublicError> {
        let (key_id, secret) = parse_presented_key(presented);
        let row = match key_id {
            Some(key_id) => self.find_by_key_id(key_id).await?,
            None => self.find_legacy(presented).await?,
        };
        let row = row.ok_or_else(PublicError::unauthorized)?;
        if !verify_secret(secret, &row.secret_hash) {
            return Err(PublicError::unauthorized());
        }
        Ok(AuthenticatedKey {
            api_key_id: row.id,
            rpm_limit: row.rpm_limit,
            daily_budget: row.daily_budget,
            monthly_budget: row.monthly_budget,
        })
    }

    async fn find_by_key_id(&self, key_id: &str) -> Result<Option<ApiKeyRow>, PublicError> {
        self.storage
            .find_api_key_by_key_id(key_id)
            .await
            .map_err(storage_err_to_unauthorized)
    }

    /// Legacy keys carry no `key_id`; scan the active legacy set and test
    /// the whole presented token against each hash — O(n) in legacy key
    /// count (`spec.md` §4.G).
    async fn find_legacy(&self, presented: &str) -> Result<Option<ApiKeyRow>, PublicError> {
        let candidates = self
            .storage
            .list_active_legacy_keys()
            .await
            .map_err(storage_err_to_unauthorized)?;
        for candidate in candidates {
            if verify_secret(presented, &candidate.secret_hash) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

fn storage_err_to_unauthorized(_: StorageError) -> PublicError {
    PublicError::unauthorized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_form_splits_on_first_dot_and_strips_prefix() {
        assert_eq!(parse_presented_key("agw_abc.secret123"), (Some("abc"), "secret123"));
    }

    #[test]
    fn missing_prefix_still_splits() {
        assert_eq!(parse_presented_key("abc.secret123"), (Some("abc"), "secret123"));
    }

    #[test]
    fn no_dot_is_legacy() {
        assert_eq!(parse_presented_key("wholeoldtoken"), (None, "wholeoldtoken"));
    }

    #[test]
    fn empty_left_side_falls_back_to_legacy() {
        assert_eq!(parse_presented_key(".secretonly"), (None, ".secretonly"));
    }

    #[test]
    fn empty_right_side_falls_back_to_legacy() {
        assert_eq!(parse_presented_key("agw_abc."), (None, "agw_abc."));
    }

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_secret("correct horse battery staple").unwrap();
        assert!(verify_secret("correct horse battery staple", &hash));
        assert!(!verify_secret("wrong", &hash));
    }
}
