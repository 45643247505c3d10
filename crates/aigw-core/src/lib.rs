//! Everything between the router and the provider/storage layers:
//! authentication, admission control, the sync request pipeline, and the
//! durable job/webhook engines (`spec.md` §4.E-4.P).

pub mod auth;
pub mod bootstrap;
pub mod budget;
pub mod error;
pub mod job_engine;
pub mod metrics;
pub mod models_cache;
pub mod pipeline;
pub mod provisioning;
pub mod queue;
pub mod rate_limit;
pub mod state;
pub mod webhook_engine;

pub use auth::{AuthenticatedKey, Authenticator};
pub use budget::BudgetEnforcer;
pub use error::PublicError;
pub use metrics::Metrics;
pub use models_cache::ModelsCache;
pub use rate_limit::RateLimiter;
pub use state::AppState;
