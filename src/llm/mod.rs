//! Answering layer
//!
//! Sends the knowledge base and the conversation to a hosted model:
//! - `endpoint`: an HTTP route that holds the credentials server-side
//! - `openai`: an OpenAI-compatible API, called directly

pub mod endpoint;
pub mod error;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export key types
pub use endpoint::EndpointAnswerer;
pub use error::AnswerError;
pub use openai::OpenAiAnswerer;
pub use provider::Answerer;
pub use types::{ChatMessage, Role};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AnsweringConfig, Backend};

/// Build the configured answering backend.
pub fn answerer_from_config(config: &AnsweringConfig) -> Result<Arc<dyn Answerer>, AnswerError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Ok(match config.backend {
        Backend::Endpoint => Arc::new(EndpointAnswerer::new(&config.endpoint, timeout)?),
        Backend::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or(AnswerError::MissingCredential)?;
            Arc::new(OpenAiAnswerer::new(
                &config.base_url,
                api_key,
                &config.model,
                config.temperature,
                timeout,
            )?)
        }
    })
}
