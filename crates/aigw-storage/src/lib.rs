//! Durable records: requests, jobs, attempts, deliveries (`spec.md` §4.K).
//!
//! Entity-first sea-orm schema, synced at bootstrap rather than driven by a
//! migration-file system — this gateway has no external migration tooling,
//! matching the teacher's `Schema::sync` approach.

pub mod db;
pub mod entities;
pub mod sea_orm_storage;
pub mod storage;

pub use sea_orm_storage::SeaOrmStorage;
pub use storage::{
    ApiKeyRow, JobRow, JobTerminalUpdate, NewJob, NewJobAttempt, NewRequestLog,
    NewWebhookDelivery, Storage, StorageError, StorageResult,
};
