use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use aigw_provider_core::{ProviderError, ProviderResult};

/// Per-process cache holding one `wreq::Client` per provider name
/// (`spec.md` §4.D: "A per-process cache holds one instance per provider
/// name.").
static CLIENT_CACHE: OnceLock<Mutex<HashMap<String, wreq::Client>>> = OnceLock::new();

pub(crate) fn client_for_provider(name: &str) -> ProviderResult<wreq::Client> {
    let cache = CLIENT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache
        .lock()
        .map_err(|_| ProviderError::Other("http client cache lock failed".to_string()))?;

    if let Some(client) = guard.get(name) {
        return Ok(client.clone());
    }

    let client = wreq::Client::builder()
        .build()
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    guard.insert(name.to_string(), client.clone());
    Ok(client)
}
