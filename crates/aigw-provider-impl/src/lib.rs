//! Concrete `Provider` implementations: the deterministic mock used in
//! tests/dev, and an OpenAI-compatible HTTP client (`spec.md` §4.D).

mod providers;

pub use providers::{MockProvider, OpenAiConfig, OpenAiProvider};
