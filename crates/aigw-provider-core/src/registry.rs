use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::Provider;

/// Per-process cache holding one provider instance per name
/// (`spec.md` §4.D). `aigw-core`'s bootstrap populates this once and shares
/// it across the sync pipeline and the worker loop.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}
