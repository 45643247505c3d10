//! Shared, dependency-light types used across the gateway workspace.
//!
//! Nothing here depends on axum, sea-orm, or any concrete HTTP client;
//! higher layers build on top of these small vocabulary types.

pub mod ids;
pub mod kinds;

pub use ids::{JobId, KeyId};
pub use kinds::{JobStatus, RequestKind, TerminalStatus};

/// Monetary amount in currency units, 4-decimal precision per `spec.md` §3.
pub type Money = rust_decimal::Decimal;
