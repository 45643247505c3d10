use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use aigw_pricing::{PriceTable, PriceTableConfig};
use aigw_provider_core::registry::ProviderRegistry;
use aigw_provider_core::RetryPolicy;
use aigw_provider_impl::{MockProvider, OpenAiConfig, OpenAiProvider};
use aigw_storage::sea_orm_storage::SeaOrmStorage;
use aigw_storage::Storage;

use crate::metrics::Metrics;
use crate::queue::RedisQueue;
use crate::rate_limit::RateLimiter;
use crate::state::{AppState, AppStateConfig};

/// Every `spec.md` §6 environment variable (`SPEC_FULL.md` §4.L), mirroring
/// the teacher's `CliArgs` (clap `derive` + `env`, CLI > ENV > default).
#[derive(Debug, Clone, Parser)]
#[command(name = "aigw", version, about = "Multi-tenant AI-provider gateway")]
pub struct CliArgs {
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub app_env: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "REDIS_URL")]
    pub redis_url: String,

    #[arg(long, env = "DEFAULT_PROVIDER", default_value = "mock")]
    pub default_provider: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    pub openai_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_TIMEOUT_SECONDS", default_value_t = 30)]
    pub openai_timeout_seconds: u64,

    #[arg(long, env = "OPENAI_RETRIES", default_value_t = 3)]
    pub openai_retries: u32,

    #[arg(long, env = "OPENAI_HTTP_REFERER")]
    pub openai_http_referer: Option<String>,

    #[arg(long, env = "OPENAI_TITLE")]
    pub openai_title: Option<String>,

    #[arg(long, env = "DEFAULT_RPM_LIMIT", default_value_t = 60)]
    pub default_rpm_limit: i64,

    #[arg(long, env = "MODELS_CACHE_TTL_SECONDS", default_value_t = 300)]
    pub models_cache_ttl_seconds: u64,

    /// Backs the job/webhook queues (Redis lists, not a Celery broker — see
    /// `DESIGN.md`). Falls back to `REDIS_URL` when unset.
    #[arg(long, env = "CELERY_BROKER_URL")]
    pub celery_broker_url: Option<String>,

    /// Accepted, unused: job results live in the `jobs` table.
    #[arg(long, env = "CELERY_RESULT_BACKEND")]
    pub celery_result_backend: Option<String>,

    #[arg(long, env = "WEBHOOK_TIMEOUT_SECONDS", default_value_t = 10)]
    pub webhook_timeout_seconds: u64,

    #[arg(long, env = "WORKER_METRICS_PORT", default_value_t = 9091)]
    pub worker_metrics_port: u16,

    /// Accepted, unused: reserved for the out-of-scope dashboard.
    #[arg(long, env = "DASHBOARD_LOGIN")]
    pub dashboard_login: Option<String>,

    #[arg(long, env = "DASHBOARD_PASSWORD")]
    pub dashboard_password: Option<String>,
}

pub struct Bootstrap {
    pub storage: Arc<SeaOrmStorage>,
    pub state: Arc<AppState>,
}

/// Seeds `tracing-subscriber` from `LOG_LEVEL` (`SPEC_FULL.md` §4.M). Safe
/// to call once per process; a second call is a no-op.
pub fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Connects storage + Redis, syncs the schema, constructs every ambient
/// component, and assembles the shared `AppState` (`SPEC_FULL.md` §4.L).
pub async fn bootstrap(args: &CliArgs) -> anyhow::Result<Bootstrap> {
    init_logging(&args.log_level);

    let storage = Arc::new(
        SeaOrmStorage::connect(&args.database_url)
            .await
            .context("connect storage")?,
    );
    storage.sync().await.context("schema sync")?;

    let queue_dsn = args.celery_broker_url.clone().unwrap_or_else(|| args.redis_url.clone());
    let queue_client = redis::Client::open(queue_dsn).context("open redis queue client")?;
    let queue_conn = queue_client
        .get_connection_manager()
        .await
        .context("connect redis queue")?;
    let job_queue = RedisQueue::new(queue_conn.clone(), "jobs");
    let webhook_queue = RedisQueue::new(queue_conn, "webhooks");

    let rate_limiter = RateLimiter::connect(&args.redis_url, args.default_rpm_limit)
        .await
        .context("connect redis rate limiter")?;

    let prices = PriceTable::load(default_price_table()).context("load price table")?;

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(MockProvider));
    if !args.openai_api_key.is_empty() {
        registry.register(Arc::new(OpenAiProvider::new(OpenAiConfig {
            name: "openai".to_string(),
            base_url: args.openai_base_url.clone(),
            api_key: args.openai_api_key.clone(),
            referer: args.openai_http_referer.clone(),
            title: args.openai_title.clone(),
            retry: RetryPolicy {
                max_attempts: args.openai_retries.max(1),
            },
        })));
    }

    let metrics = Metrics::new().context("register metrics")?;

    let state = AppState::new(
        storage.clone(),
        registry,
        prices,
        rate_limiter,
        metrics,
        job_queue,
        webhook_queue,
        AppStateConfig {
            models_cache_ttl: Duration::from_secs(args.models_cache_ttl_seconds),
            webhook_timeout: Duration::from_secs(args.webhook_timeout_seconds),
            default_provider: args.default_provider.clone(),
        },
    );

    Ok(Bootstrap {
        storage,
        state: Arc::new(state),
    })
}

/// A single default rate with no per-model overrides. Real deployments load
/// this from the configuration blob named in `spec.md` §4.A; wiring that
/// loader in is out of scope here (no config-file format is specified).
fn default_price_table() -> PriceTableConfig {
    use rust_decimal_macros::dec;
    PriceTableConfig {
        defaults: aigw_pricing::RateConfig {
            prompt_per_1k: dec!(0.50),
            completion_per_1k: dec!(1.50),
        },
        models: Vec::new(),
    }
}
