//! Extraction error types

use thiserror::Error;

/// Substring that identifies a worker/library version mismatch, whichever
/// layer reported it.
pub const WORKER_MISMATCH_MARKER: &str = "does not match the Worker version";

/// Errors raised while turning a document into text
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The background worker was pinned to a different version than the
    /// PDF text layer. Recoverable by parsing without the worker.
    #[error("The API version \"{api}\" does not match the Worker version \"{worker}\".")]
    WorkerVersionMismatch { api: String, worker: String },

    /// The background worker could not be started or has gone away
    #[error("PDF worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Failed to parse DOCX: {0}")]
    Docx(String),

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any of the above, tagged with the file it happened on
    #[error("Failed to extract '{file}': {source}")]
    File {
        file: String,
        #[source]
        source: Box<ExtractionError>,
    },
}

impl ExtractionError {
    pub fn pdf(message: impl std::fmt::Display) -> Self {
        Self::Pdf(message.to_string())
    }

    pub fn docx(message: impl std::fmt::Display) -> Self {
        Self::Docx(message.to_string())
    }

    /// Tag the error with a file name (once).
    pub fn for_file(self, file: &str) -> Self {
        match self {
            Self::File { .. } => self,
            other => Self::File {
                file: file.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// True when the worker could not take the job at all.
    pub fn is_worker_unavailable(&self) -> bool {
        match self {
            Self::WorkerUnavailable(_) => true,
            Self::File { source, .. } => source.is_worker_unavailable(),
            _ => false,
        }
    }

    /// True when the error is a worker version mismatch, either as the
    /// typed variant or as a message from the underlying library.
    pub fn is_worker_mismatch(&self) -> bool {
        match self {
            Self::WorkerVersionMismatch { .. } => true,
            Self::File { source, .. } => source.is_worker_mismatch(),
            other => other.to_string().contains(WORKER_MISMATCH_MARKER),
        }
    }
}
