use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// In-process cache for `GET /v1/models` responses (`spec.md` §4.H). Key:
/// `models:<provider>:<sha256(base_url)|->`.
pub struct ModelsCache {
    entries: Mutex<HashMap<String, (serde_json::Value, Instant)>>,
    ttl: Duration,
}

impl ModelsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn key(provider: &str, base_url: Option<&str>) -> String {
        let suffix = match base_url {
            Some(url) => hex::encode(Sha256::digest(url.as_bytes())),
            None => "-".to_string(),
        };
        format!("models:{provider}:{suffix}")
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.lock().unwrap();
        let (value, inserted_at) = entries.get(key)?;
        if inserted_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: String, value: serde_json::Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, (value, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl_miss_after_expiry() {
        let cache = ModelsCache::new(Duration::from_millis(20));
        let key = ModelsCache::key("mock", None);
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), serde_json::json!({"data": []}));
        assert!(cache.get(&key).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn key_depends_on_base_url_hash() {
        let a = ModelsCache::key("openai", Some("https://api.openai.com"));
        let b = ModelsCache::key("openai", Some("https://openrouter.ai"));
        assert_ne!(a, b);
    }
}
