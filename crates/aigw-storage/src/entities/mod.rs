pub mod api_keys;
pub mod job_attempts;
pub mod jobs;
pub mod request_logs;
pub mod webhook_deliveries;

pub use api_keys::Entity as ApiKeys;
pub use job_attempts::Entity as JobAttempts;
pub use jobs::Entity as Jobs;
pub use request_logs::Entity as RequestLogs;
pub use webhook_deliveries::Entity as WebhookDeliveries;
