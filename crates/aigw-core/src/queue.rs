use serde::{Serialize, de::DeserializeOwned};

/// A reliable-dequeue queue backed by a Redis list, mirroring
/// `BRPOPLPUSH`'s move-to-processing-list pattern instead of a
/// Celery-compatible broker (`DESIGN.md` open question decision). A message
/// popped but never acked stays visible in the processing list for
/// crash-recovery sweeps, which this gateway does not yet implement.
#[derive(Clone)]
pub struct RedisQueue {
    conn: redis::aio::ConnectionManager,
    pending_key: String,
    processing_key: String,
}

impl RedisQueue {
    pub fn new(conn: redis::aio::ConnectionManager, name: &str) -> Self {
        Self {
            conn,
            pending_key: format!("aigw:{name}:pending"),
            processing_key: format!("aigw:{name}:processing"),
        }
    }

    pub async fn push<T: Serialize>(&self, message: &T) -> redis::RedisResult<()> {
        use redis::AsyncCommands;
        let payload = serde_json::to_string(message)
            .map_err(|e| redis::RedisError::from((redis::ErrorKind::TypeError, "serialize", e.to_string())))?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(&self.pending_key, payload).await?;
        Ok(())
    }

    /// Blocks up to `timeout_secs` waiting for a message, atomically moving
    /// it onto the processing list. Returns `(raw_json, popped)` so the
    /// caller can `ack` by removing the exact string later.
    pub async fn pop(&self, timeout_secs: f64) -> redis::RedisResult<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .brpoplpush(&self.pending_key, &self.processing_key, timeout_secs)
            .await?;
        Ok(raw)
    }

    pub async fn ack(&self, raw: &str) -> redis::RedisResult<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(&self.processing_key, 1, raw).await?;
        Ok(())
    }

    /// Re-enqueue after removing the processing-list copy. Callers sleep for
    /// the backoff duration before calling this (`spec.md` §4.I/§4.J).
    pub async fn requeue<T: Serialize>(&self, raw: &str, message: &T) -> redis::RedisResult<()> {
        self.ack(raw).await?;
        self.push(message).await
    }

    pub fn decode<T: DeserializeOwned>(raw: &str) -> serde_json::Result<T> {
        serde_json::from_str(raw)
    }
}
