//! Text extraction
//!
//! Turns uploaded documents into plain text:
//! - `sniff`: decide the format from MIME type and file name
//! - `pdf`, `docx`, `text`: one extractor per format
//! - `worker`: lazy start-up of the PDF background worker
//!
//! The [`Dispatcher`] ties them together and only knows the
//! [`TextExtractor`] interface.

pub mod docx;
pub mod error;
pub mod pdf;
pub mod sniff;
pub mod text;
pub mod worker;

pub use error::ExtractionError;
pub use sniff::{classify, DocumentFormat};

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use crate::config::PdfConfig;
use crate::types::UploadedFile;
use docx::DocxExtractor;
use pdf::{OxideTextLayer, PdfExtractor, PdfTextLayer};
use text::PlainTextExtractor;
use worker::{ThreadLoader, WorkerBootstrap};

/// Converts the bytes of one document format into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Routes files to the extractor for their format.
pub struct Dispatcher {
    pdf: Arc<dyn TextExtractor>,
    docx: Arc<dyn TextExtractor>,
    text: Arc<dyn TextExtractor>,
    bootstrap: Option<Arc<WorkerBootstrap>>,
}

impl Dispatcher {
    /// Dispatcher with the bundled extractors and the given PDF bootstrap
    pub fn new(bootstrap: Arc<WorkerBootstrap>) -> Self {
        Self {
            pdf: Arc::new(PdfExtractor::new(Arc::clone(&bootstrap))),
            docx: Arc::new(DocxExtractor),
            text: Arc::new(PlainTextExtractor),
            bootstrap: Some(bootstrap),
        }
    }

    /// Dispatcher whose PDF worker is pinned as configured
    pub fn from_config(config: &PdfConfig) -> Self {
        let layer: Arc<dyn PdfTextLayer> = Arc::new(OxideTextLayer);
        let version = config
            .worker_version
            .clone()
            .unwrap_or_else(|| layer.version().to_string());

        Self::new(Arc::new(WorkerBootstrap::new(
            version,
            layer,
            Box::new(ThreadLoader),
        )))
    }

    /// Dispatcher built from arbitrary extractors
    pub fn with_extractors(
        pdf: Arc<dyn TextExtractor>,
        docx: Arc<dyn TextExtractor>,
        text: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            pdf,
            docx,
            text,
            bootstrap: None,
        }
    }

    /// The PDF worker bootstrap, when the bundled PDF extractor is in use
    pub fn bootstrap(&self) -> Option<&WorkerBootstrap> {
        self.bootstrap.as_deref()
    }

    fn extractor_for(&self, format: DocumentFormat) -> &dyn TextExtractor {
        match format {
            DocumentFormat::Pdf => self.pdf.as_ref(),
            DocumentFormat::Docx => self.docx.as_ref(),
            DocumentFormat::Txt | DocumentFormat::Unknown => self.text.as_ref(),
        }
    }

    /// Extract one file. The result is trimmed.
    pub async fn extract(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        let format = classify(file);
        debug!(
            file = %file.name,
            format = format.name(),
            bytes = file.size(),
            "dispatching extraction"
        );

        if file.is_empty() {
            return Ok(String::new());
        }

        let text = self
            .extractor_for(format)
            .extract(&file.bytes)
            .await
            .map_err(|e| e.for_file(&file.name))?;

        Ok(text.trim().to_string())
    }

    /// Extract every file concurrently. Results keep the input order; the
    /// first failure fails the whole batch.
    pub async fn extract_all(&self, files: &[UploadedFile]) -> Result<Vec<String>, ExtractionError> {
        try_join_all(files.iter().map(|file| self.extract(file))).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::docx::tests::docx_with_body;
    use crate::extract::pdf::tests::FakeLayer;
    use crate::extract::worker::WorkerState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Dispatcher that treats every format as plain text
    pub(crate) fn text_only_dispatcher() -> Dispatcher {
        Dispatcher::with_extractors(
            Arc::new(PlainTextExtractor),
            Arc::new(PlainTextExtractor),
            Arc::new(PlainTextExtractor),
        )
    }

    fn dispatcher_with_layer(pin: &str, layer: Arc<FakeLayer>) -> Dispatcher {
        Dispatcher::new(Arc::new(WorkerBootstrap::new(
            pin,
            layer,
            Box::new(ThreadLoader),
        )))
    }

    /// Extractor that echoes its input after a delay, counting calls.
    struct SlowEcho {
        delay_ms: u64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextExtractor for SlowEcho {
        async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = String::from_utf8_lossy(bytes).to_string();
            // Earlier files sleep longer so they finish last.
            let delay = self.delay_ms.saturating_sub(text.len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(text)
        }
    }

    struct Failing;

    #[async_trait]
    impl TextExtractor for Failing {
        async fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            Err(ExtractionError::docx("corrupt archive"))
        }
    }

    #[tokio::test]
    async fn test_routes_by_format() {
        let layer = Arc::new(FakeLayer::with_pages("1", vec![vec!["pdf", "text"]]));
        let dispatcher = dispatcher_with_layer("1", layer);

        let pdf = UploadedFile::new("a.pdf", Some("application/pdf"), b"%PDF".to_vec());
        let docx = UploadedFile::new(
            "b.docx",
            None,
            docx_with_body("<w:p><w:r><w:t>docx text</w:t></w:r></w:p>"),
        );
        let txt = UploadedFile::new("c.txt", Some("text/plain"), b"  plain text \n".to_vec());

        assert_eq!(dispatcher.extract(&pdf).await.unwrap(), "pdf text");
        assert_eq!(dispatcher.extract(&docx).await.unwrap(), "docx text");
        assert_eq!(dispatcher.extract(&txt).await.unwrap(), "plain text");
    }

    #[tokio::test]
    async fn test_unknown_format_decodes_raw() {
        let layer = Arc::new(FakeLayer::with_pages("1", vec![]));
        let dispatcher = dispatcher_with_layer("1", layer);

        let file = UploadedFile::new("data.csv", None, b"a,b\n1,\xFF".to_vec());
        let text = dispatcher.extract(&file).await.unwrap();
        assert!(text.starts_with("a,b\n1,"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_empty_file_skips_parsers() {
        let layer = Arc::new(FakeLayer::with_pages("1", vec![vec!["never"]]));
        let dispatcher = dispatcher_with_layer("1", Arc::clone(&layer));

        let file = UploadedFile::new("empty.pdf", Some("application/pdf"), Vec::new());
        assert_eq!(dispatcher.extract(&file).await.unwrap(), "");
        assert_eq!(layer.calls.load(Ordering::SeqCst), 0);

        // The worker is only started once a PDF actually needs parsing.
        let bootstrap = dispatcher.bootstrap().unwrap();
        assert_eq!(bootstrap.state(), WorkerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_mime_wins_over_misleading_extension() {
        let layer = Arc::new(FakeLayer::with_pages("1", vec![vec!["from", "pdf"]]));
        let dispatcher = dispatcher_with_layer("1", layer);

        let file = UploadedFile::new("notes.txt", Some("application/pdf"), b"%PDF".to_vec());
        assert_eq!(dispatcher.extract(&file).await.unwrap(), "from pdf");
    }

    #[tokio::test]
    async fn test_mismatched_worker_still_extracts() {
        let layer = Arc::new(FakeLayer::with_pages("3.1", vec![vec!["Quarterly", "report"]]));
        let dispatcher = dispatcher_with_layer("3.0", layer);

        let file = UploadedFile::new("report.PDF", None, b"%PDF".to_vec());
        let text = dispatcher.extract(&file).await.unwrap();
        assert!(!text.is_empty());
        assert_eq!(text, "Quarterly report");
    }

    #[tokio::test]
    async fn test_extract_all_preserves_order() {
        let echo = Arc::new(SlowEcho {
            delay_ms: 60,
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::with_extractors(
            Arc::clone(&echo) as Arc<dyn TextExtractor>,
            Arc::clone(&echo) as Arc<dyn TextExtractor>,
            Arc::clone(&echo) as Arc<dyn TextExtractor>,
        );

        let files = vec![
            UploadedFile::new("1.txt", None, b"a".to_vec()),
            UploadedFile::new("2.txt", None, b"bbb".to_vec()),
            UploadedFile::new("3.txt", None, b"ccccc".to_vec()),
        ];

        let texts = dispatcher.extract_all(&files).await.unwrap();
        assert_eq!(texts, vec!["a", "bbb", "ccccc"]);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_extract_all_fails_whole_batch() {
        let dispatcher = Dispatcher::with_extractors(
            Arc::new(PlainTextExtractor),
            Arc::new(Failing),
            Arc::new(PlainTextExtractor),
        );

        let files = vec![
            UploadedFile::new("ok.txt", None, b"fine".to_vec()),
            UploadedFile::new("broken.docx", None, b"PK".to_vec()),
        ];

        let err = dispatcher.extract_all(&files).await.unwrap_err();
        assert!(err.to_string().contains("broken.docx"));
    }
}
