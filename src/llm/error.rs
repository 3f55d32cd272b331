//! Answering errors

use thiserror::Error;

/// Errors from an answering backend
#[derive(Debug, Error)]
pub enum AnswerError {
    /// No API key configured for a backend that needs one
    #[error("No API key configured (set FOLIO_API_KEY or OPENAI_API_KEY, or run 'folio init')")]
    MissingCredential,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. The body is kept for logging only.
    #[error("Answering service returned {status}")]
    Status { status: u16, body: String },

    #[error("Could not decode reply: {0}")]
    Decode(String),

    #[error("Answering service returned no reply")]
    EmptyReply,
}
