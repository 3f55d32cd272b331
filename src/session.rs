//! Chat session state
//!
//! A session waits for documents, builds a knowledge base from them, and
//! then answers questions one turn at a time:
//!
//! ```text
//! AwaitingDocuments --begin_processing--> Processing --finish(Ok)--> Ready
//!                   <-------finish(Err)--
//! ```
//!
//! Once ready, a session stays ready. A new batch is processed while the
//! old knowledge base keeps answering, and only replaces it on success.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::extract::{Dispatcher, ExtractionError};
use crate::knowledge::KnowledgeBase;
use crate::llm::{AnswerError, Answerer, ChatMessage};
use crate::pipeline::ProgressTracker;
use crate::types::UploadedFile;

/// Shown after every successful processing
pub const WELCOME_MESSAGE: &str = "Your documents are ready. Ask me anything about them.";

/// Appended when the answering backend fails
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error while answering. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingDocuments,
    Processing,
    Ready,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No files selected")]
    NoFiles,

    #[error("Documents are already being processed")]
    AlreadyProcessing,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Why a chat turn was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    ReplyInFlight,
    NotReady,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Nothing to send",
            Self::ReplyInFlight => "Still waiting for the previous answer",
            Self::NotReady => "Load some documents first",
        }
    }
}

/// Result of [`ChatSession::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(Rejection),
    Answered(ChatMessage),
    Apologized(ChatMessage),
}

/// What to send to the answering backend for one turn
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub knowledge_base: String,
    pub messages: Vec<ChatMessage>,
}

/// Conversation state for one user
pub struct ChatSession {
    phase: SessionPhase,
    knowledge: KnowledgeBase,
    messages: Vec<ChatMessage>,
    processing: bool,
    awaiting_reply: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::AwaitingDocuments,
            knowledge: KnowledgeBase::default(),
            messages: Vec::new(),
            processing: false,
            awaiting_reply: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Start processing a batch of `file_count` files.
    pub fn begin_processing(&mut self, file_count: usize) -> Result<(), SessionError> {
        if file_count == 0 {
            return Err(SessionError::NoFiles);
        }
        if self.processing {
            return Err(SessionError::AlreadyProcessing);
        }

        self.processing = true;
        if self.phase == SessionPhase::AwaitingDocuments {
            self.phase = SessionPhase::Processing;
        }
        Ok(())
    }

    /// Install the result of a batch.
    ///
    /// On success the knowledge base is replaced and the transcript starts
    /// over with a welcome message. On failure a ready session keeps
    /// everything it had; a first-time failure goes back to waiting.
    pub fn finish_processing(
        &mut self,
        result: Result<KnowledgeBase, ExtractionError>,
    ) -> Result<(), SessionError> {
        self.processing = false;

        match result {
            Ok(knowledge) => {
                info!(summary = %knowledge.summary(), "documents ready");
                self.knowledge = knowledge;
                self.messages = vec![ChatMessage::assistant(WELCOME_MESSAGE)];
                self.awaiting_reply = false;
                self.phase = SessionPhase::Ready;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "document processing failed");
                if self.phase == SessionPhase::Processing {
                    self.phase = SessionPhase::AwaitingDocuments;
                }
                Err(e.into())
            }
        }
    }

    /// Extract `files` and install the resulting knowledge base.
    pub async fn process(
        &mut self,
        files: &[UploadedFile],
        dispatcher: &Dispatcher,
    ) -> Result<(), SessionError> {
        self.begin_processing(files.len())?;
        let result = KnowledgeBase::build(files, dispatcher).await;
        self.finish_processing(result)
    }

    /// Like [`process`](Self::process), with a progress bar.
    pub async fn process_with_progress(
        &mut self,
        files: &[UploadedFile],
        dispatcher: &Dispatcher,
        progress: &ProgressTracker,
    ) -> Result<(), SessionError> {
        self.begin_processing(files.len())?;
        let result = KnowledgeBase::build_with_progress(files, dispatcher, progress).await;
        if result.is_err() {
            progress.abandon();
        }
        self.finish_processing(result)
    }

    /// Start a chat turn. The user message is appended immediately.
    pub fn begin_turn(&mut self, input: &str) -> Result<AnswerRequest, Rejection> {
        let content = input.trim();
        if content.is_empty() {
            return Err(Rejection::EmptyInput);
        }
        if self.awaiting_reply {
            return Err(Rejection::ReplyInFlight);
        }
        if !self.is_ready() {
            return Err(Rejection::NotReady);
        }

        self.messages.push(ChatMessage::user(content));
        self.awaiting_reply = true;

        Ok(AnswerRequest {
            knowledge_base: self.knowledge.text().to_string(),
            messages: self.messages.clone(),
        })
    }

    /// Finish a chat turn. Failures become an apology in the transcript.
    pub fn complete_turn(&mut self, result: Result<String, AnswerError>) -> SubmitOutcome {
        self.awaiting_reply = false;

        match result {
            Ok(reply) => {
                let message = ChatMessage::assistant(reply);
                self.messages.push(message.clone());
                SubmitOutcome::Answered(message)
            }
            Err(e) => {
                match &e {
                    AnswerError::Status { status, body } => {
                        error!(status, body = %body, "answering service failed")
                    }
                    other => error!(error = %other, "answering failed"),
                }
                let message = ChatMessage::assistant(APOLOGY_MESSAGE);
                self.messages.push(message.clone());
                SubmitOutcome::Apologized(message)
            }
        }
    }

    /// Run one full chat turn against `answerer`.
    pub async fn submit(&mut self, input: &str, answerer: &dyn Answerer) -> SubmitOutcome {
        let request = match self.begin_turn(input) {
            Ok(request) => request,
            Err(reason) => {
                warn!(?reason, "chat turn rejected");
                return SubmitOutcome::Rejected(reason);
            }
        };

        let result = answerer
            .answer(&request.knowledge_base, &request.messages)
            .await;
        self.complete_turn(result)
    }

    /// Start the conversation over, keeping the knowledge base.
    pub fn clear_history(&mut self) {
        if self.is_ready() && !self.awaiting_reply {
            self.messages = vec![ChatMessage::assistant(WELCOME_MESSAGE)];
        }
    }
}
