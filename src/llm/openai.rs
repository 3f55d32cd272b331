//! OpenAI-compatible answerer.
//!
//! Calls a Chat Completions API directly. The knowledge base goes into the
//! system message and the transcript follows it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::AnswerError;
use super::provider::Answerer;
use super::types::{ChatMessage, WireMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Instructions placed ahead of the knowledge base
const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about the \
user's documents. Answer only from the documents below. If the answer is not in them, \
say so plainly. Use markdown for formatting.";

/// OpenAI answerer configuration and state.
pub struct OpenAiAnswerer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl OpenAiAnswerer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, AnswerError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnswerError::MissingCredential);
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature,
        })
    }
}

/// System message grounding the model in the knowledge base.
pub fn system_prompt(knowledge_base: &str) -> String {
    format!("{}\n\n<documents>\n{}\n</documents>", SYSTEM_PROMPT, knowledge_base)
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn answer(
        &self,
        knowledge_base: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AnswerError> {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);
        api_messages.push(WireMessage {
            role: "system".to_string(),
            content: system_prompt(knowledge_base),
        });
        api_messages.extend(messages.iter().map(WireMessage::from));

        let request = ChatRequest {
            model: &self.model,
            messages: api_messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| AnswerError::Decode(e.to_string()))?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "completion usage"
            );
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AnswerError::EmptyReply)
    }
}

// -----------------------------------------------------------------------------
// OpenAI DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
