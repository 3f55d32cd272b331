//! Answering endpoint client.
//!
//! Talks to an HTTP route that holds the model credentials server-side.
//! The route takes the knowledge base and the transcript and returns the
//! reply:
//!
//! ```text
//! POST {"knowledgeBase": "...", "messages": [{"role": "user", "content": "..."}]}
//! 200  {"reply": "..."}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::AnswerError;
use super::provider::Answerer;
use super::types::{ChatMessage, WireMessage};

pub struct EndpointAnswerer {
    client: Client,
    url: String,
}

impl EndpointAnswerer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AnswerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Answerer for EndpointAnswerer {
    fn name(&self) -> &str {
        "endpoint"
    }

    async fn answer(
        &self,
        knowledge_base: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AnswerError> {
        let request = AnswerRequest {
            knowledge_base,
            messages: messages.iter().map(WireMessage::from).collect(),
        };

        debug!(url = %self.url, messages = messages.len(), "posting to answering endpoint");

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let reply: AnswerResponse =
            serde_json::from_str(&body).map_err(|e| AnswerError::Decode(e.to_string()))?;

        Ok(reply.reply)
    }
}

// -----------------------------------------------------------------------------
// Wire DTOs
// -----------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest<'a> {
    knowledge_base: &'a str,
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct AnswerResponse {
    reply: String,
}
