use std::sync::Arc;
use std::time::Duration;

use aigw_pricing::PriceTable;
use aigw_provider_core::registry::ProviderRegistry;
use aigw_storage::sea_orm_storage::SeaOrmStorage;

use crate::auth::Authenticator;
use crate::budget::BudgetEnforcer;
use crate::metrics::Metrics;
use crate::models_cache::ModelsCache;
use crate::queue::RedisQueue;
use crate::rate_limit::RateLimiter;

/// Everything a request handler or worker tick needs, assembled once at
/// bootstrap and shared behind `Arc`s (`spec.md` §4.L). Concrete over
/// `SeaOrmStorage` rather than generic over `Storage` — there is exactly one
/// storage backend in this gateway, unlike the teacher's multi-provider
/// credential pool which does need the indirection.
pub struct AppState {
    pub storage: Arc<SeaOrmStorage>,
    pub providers: Arc<ProviderRegistry>,
    pub prices: Arc<PriceTable>,
    pub authenticator: Arc<Authenticator<SeaOrmStorage>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub budget: Arc<BudgetEnforcer<SeaOrmStorage>>,
    pub metrics: Arc<Metrics>,
    pub models_cache: Arc<ModelsCache>,
    pub job_queue: RedisQueue,
    pub webhook_queue: RedisQueue,
    pub webhook_timeout: Duration,
    pub default_provider: String,
}

pub struct AppStateConfig {
    pub models_cache_ttl: Duration,
    pub webhook_timeout: Duration,
    pub default_provider: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        providers: ProviderRegistry,
        prices: PriceTable,
        rate_limiter: RateLimiter,
        metrics: Metrics,
        job_queue: RedisQueue,
        webhook_queue: RedisQueue,
        config: AppStateConfig,
    ) -> Self {
        let authenticator = Arc::new(Authenticator::new(storage.clone()));
        let budget = Arc::new(BudgetEnforcer::new(storage.clone()));
        Self {
            storage,
            providers: Arc::new(providers),
            prices: Arc::new(prices),
            authenticator,
            rate_limiter: Arc::new(rate_limiter),
            budget,
            metrics: Arc::new(metrics),
            models_cache: Arc::new(ModelsCache::new(config.models_cache_ttl)),
            job_queue,
            webhook_queue,
            webhook_timeout: config.webhook_timeout,
            default_provider: config.default_provider,
        }
    }
}
