//! The Answerer abstraction.
//!
//! Every answering backend takes the knowledge base plus the transcript so
//! far and returns the assistant's next reply.

use async_trait::async_trait;

use super::error::AnswerError;
use super::types::ChatMessage;

/// The core trait for answering backends.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Short name for status output
    fn name(&self) -> &str;

    /// Answer the last user message in `messages`, grounded in
    /// `knowledge_base`.
    async fn answer(
        &self,
        knowledge_base: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AnswerError>;
}
