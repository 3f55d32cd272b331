//! folio: ask questions about your documents
//!
//! Extracts the text of PDF, DOCX and plain text files, joins it into a
//! single knowledge base and forwards it, together with the conversation,
//! to a hosted language model.

pub mod config;
pub mod extract;
pub mod init;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod repl;
pub mod session;
pub mod types;

pub use config::{AnsweringConfig, Backend, Config, PdfConfig};
pub use extract::{classify, Dispatcher, DocumentFormat, ExtractionError, TextExtractor};
pub use init::{run_init, show_status, show_welcome, InitResult};
pub use knowledge::{assemble, KnowledgeBase, SEPARATOR};
pub use llm::{answerer_from_config, AnswerError, Answerer, ChatMessage, Role};
pub use pipeline::{collect_paths, load_files, ProgressTracker};
pub use render::{export_transcript_html, markdown_to_html};
pub use repl::run_repl;
pub use session::{ChatSession, Rejection, SessionError, SessionPhase, SubmitOutcome};
pub use types::UploadedFile;
