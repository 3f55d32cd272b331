//! Knowledge base assembly
//!
//! The knowledge base is the plain text of every selected document, joined
//! in selection order. It is rebuilt from scratch for each batch of files.

use serde::Serialize;
use tracing::info;

use crate::extract::{Dispatcher, ExtractionError};
use crate::pipeline::ProgressTracker;
use crate::types::UploadedFile;

/// Placed between consecutive documents
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Join extracted texts in order.
pub fn assemble<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// The joined corpus and the files it came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBase {
    text: String,
    sources: Vec<String>,
}

impl KnowledgeBase {
    pub fn new(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }

    /// Extract every file and assemble the result. Fails as a whole if any
    /// file fails.
    pub async fn build(
        files: &[UploadedFile],
        dispatcher: &Dispatcher,
    ) -> Result<Self, ExtractionError> {
        let texts = dispatcher.extract_all(files).await?;
        Ok(Self::from_texts(files, &texts))
    }

    /// Like [`build`](Self::build), reporting each finished file.
    pub async fn build_with_progress(
        files: &[UploadedFile],
        dispatcher: &Dispatcher,
        progress: &ProgressTracker,
    ) -> Result<Self, ExtractionError> {
        let texts = futures::future::try_join_all(files.iter().map(|file| async move {
            let text = dispatcher.extract(file).await?;
            progress.file_done(&file.name);
            Ok::<_, ExtractionError>(text)
        }))
        .await?;

        progress.finish();
        Ok(Self::from_texts(files, &texts))
    }

    fn from_texts(files: &[UploadedFile], texts: &[String]) -> Self {
        let kb = Self::new(
            assemble(texts),
            files.iter().map(|f| f.name.clone()).collect(),
        );
        info!(files = kb.sources.len(), chars = kb.len(), "knowledge base assembled");
        kb
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File names, in selection order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// One-line description for the terminal
    pub fn summary(&self) -> String {
        let files = self.sources.len();
        format!(
            "{} file{}, {} characters",
            files,
            if files == 1 { "" } else { "s" },
            self.len()
        )
    }
}
