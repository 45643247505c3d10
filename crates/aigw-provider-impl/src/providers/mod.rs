mod http_client;
mod mock;
mod openai;

pub use mock::MockProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
