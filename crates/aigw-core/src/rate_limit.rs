use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::PublicError;

/// Fixed-window minute counter backed by Redis (`spec.md` §4.E). Key format:
/// `rl:<api_key_id>:<endpoint>:<YYYYMMDDhhmm>`.
#[derive(Clone)]
pub struct RateLimiter {
    conn: redis::aio::ConnectionManager,
    default_limit: i64,
}

impl RateLimiter {
    pub async fn connect(redis_url: &str, default_limit: i64) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, default_limit })
    }

    /// `limit <= 0` disables the check entirely; otherwise the per-key cap
    /// wins over the process-wide default.
    pub async fn check(
        &self,
        api_key_id: Uuid,
        endpoint: &str,
        per_key_limit: Option<i32>,
    ) -> Result<(), PublicError> {
        let limit = per_key_limit.map(i64::from).unwrap_or(self.default_limit);
        if limit <= 0 {
            return Ok(());
        }
        let key = format!("rl:{api_key_id}:{endpoint}:{}", minute_window(OffsetDateTime::now_utc()));

        let mut conn = self.conn.clone();
        let count = increment_and_expire(&mut conn, &key).await?;
        if count > limit {
            return Err(PublicError::rate_limited());
        }
        Ok(())
    }

    /// `/readyz` probe (`spec.md` §6): confirms the shared Redis connection
    /// is actually reachable, not just configured.
    pub async fn ping(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

async fn increment_and_expire(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
) -> Result<i64, PublicError> {
    use redis::AsyncCommands;
    let count: i64 = conn
        .incr(key, 1)
        .await
        .map_err(|_| PublicError::rate_limited())?;
    if count == 1 {
        let _: Result<(), _> = conn.expire(key, 120).await;
    }
    Ok(count)
}

/// `YYYYMMDDhhmm`, UTC.
fn minute_window(now: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn minute_window_is_zero_padded() {
        let window = minute_window(datetime!(2026-01-05 03:07:00 UTC));
        assert_eq!(window, "202601050307");
    }
}
