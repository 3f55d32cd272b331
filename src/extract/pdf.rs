//! PDF extractor
//!
//! Text comes from the PDF text layer, page by page. Each page's fragments
//! are joined with a single space and the page ends with a newline.
//!
//! Parsing normally happens on the background worker (see
//! [`super::worker`]). When the worker turns out to be pinned to another
//! version than the text layer, or has gone away, the document is opened
//! once more with the worker disabled, on the blocking pool.

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

use super::worker::WorkerBootstrap;
use super::{ExtractionError, TextExtractor};

/// Text fragments of a single page, in reading order
pub type PageFragments = Vec<String>;

/// Version reported by the pdf_oxide text layer
pub const OXIDE_LAYER_VERSION: &str = "pdf_oxide-0.2";

/// A library that can read the text layer of a PDF.
pub trait PdfTextLayer: Send + Sync {
    /// Library version; a worker must be pinned to exactly this
    fn version(&self) -> &str;

    /// Fragments of every page, first page first. A document with no pages
    /// yields an empty list.
    fn pages(&self, bytes: &[u8]) -> Result<Vec<PageFragments>, ExtractionError>;
}

/// Text layer backed by `pdf_oxide`.
///
/// pdf_oxide only opens documents from a path, so the bytes are spooled to
/// a temporary file first.
pub struct OxideTextLayer;

impl PdfTextLayer for OxideTextLayer {
    fn version(&self) -> &str {
        OXIDE_LAYER_VERSION
    }

    fn pages(&self, bytes: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        let mut spool = tempfile::Builder::new()
            .prefix("folio-")
            .suffix(".pdf")
            .tempfile()?;
        spool.write_all(bytes)?;
        spool.flush()?;

        let mut doc = pdf_oxide::PdfDocument::open(spool.path())
            .map_err(|e| ExtractionError::pdf(format!("failed to open document: {}", e)))?;

        let page_count = doc
            .page_count()
            .map_err(|e| ExtractionError::pdf(format!("failed to count pages: {}", e)))?;

        let mut pages = Vec::new();
        for page_idx in 0..page_count {
            let text = doc.extract_text(page_idx).map_err(|e| {
                ExtractionError::pdf(format!("failed to read page {}: {}", page_idx + 1, e))
            })?;
            pages.push(fragments(&text));
        }

        Ok(pages)
    }
}

/// Split a page's text into its non-empty lines.
fn fragments(page_text: &str) -> PageFragments {
    page_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join pages: fragments separated by a space, one line per page.
pub fn join_pages(pages: &[PageFragments]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.join(" "));
        text.push('\n');
    }
    text.trim().to_string()
}

/// PDF extractor with the disabled-worker retry
pub struct PdfExtractor {
    bootstrap: Arc<WorkerBootstrap>,
}

impl PdfExtractor {
    pub fn new(bootstrap: Arc<WorkerBootstrap>) -> Self {
        Self { bootstrap }
    }

    /// Parse without the worker.
    async fn open_inline(&self, bytes: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        let layer = self.bootstrap.layer();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || layer.pages(&bytes)).await?
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = match self.bootstrap.ensure_ready().await {
            Ok(worker) => match worker.open(bytes.to_vec()).await {
                Err(e) if e.is_worker_mismatch() => {
                    warn!(error = %e, "PDF worker version mismatch, retrying without worker");
                    self.open_inline(bytes).await?
                }
                Err(e) if e.is_worker_unavailable() => {
                    warn!(error = %e, "PDF worker gone, parsing inline");
                    self.open_inline(bytes).await?
                }
                other => other?,
            },
            Err(e) => {
                warn!(error = %e, "PDF worker unavailable, parsing inline");
                self.open_inline(bytes).await?
            }
        };

        debug!(pages = pages.len(), "PDF text layer read");
        Ok(join_pages(&pages))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::error::WORKER_MISMATCH_MARKER;
    use crate::extract::worker::tests::DeadLoader;
    use crate::extract::worker::ThreadLoader;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Text layer that returns canned pages and can fail (or panic on) its
    /// first N calls.
    pub(crate) struct FakeLayer {
        version: String,
        pages: Vec<PageFragments>,
        fail_first: usize,
        failure: String,
        panic_first: usize,
        pub calls: AtomicUsize,
    }

    impl FakeLayer {
        pub(crate) fn with_pages(version: &str, pages: Vec<Vec<&str>>) -> Self {
            Self {
                version: version.to_string(),
                pages: pages
                    .into_iter()
                    .map(|p| p.into_iter().map(str::to_string).collect())
                    .collect(),
                fail_first: 0,
                failure: String::new(),
                panic_first: 0,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing_first(mut self, times: usize, message: &str) -> Self {
            self.fail_first = times;
            self.failure = message.to_string();
            self
        }

        pub(crate) fn panicking_first(mut self, times: usize) -> Self {
            self.panic_first = times;
            self
        }
    }

    impl PdfTextLayer for FakeLayer {
        fn version(&self) -> &str {
            &self.version
        }

        fn pages(&self, _bytes: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.panic_first {
                panic!("corrupt cross-reference table");
            }
            if call < self.fail_first {
                return Err(ExtractionError::pdf(&self.failure));
            }
            Ok(self.pages.clone())
        }
    }

    fn extractor(pin: &str, layer: Arc<FakeLayer>) -> PdfExtractor {
        let bootstrap = WorkerBootstrap::new(pin, layer, Box::new(ThreadLoader));
        PdfExtractor::new(Arc::new(bootstrap))
    }

    #[test]
    fn test_join_pages() {
        let pages = vec![
            vec!["Title".to_string(), "of the page".to_string()],
            vec![],
            vec!["Last".to_string()],
        ];
        assert_eq!(join_pages(&pages), "Title of the page\n\nLast");
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn test_fragments_skip_blank_lines() {
        assert_eq!(fragments("  a \n\n b\n"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_extract_on_worker() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![vec!["Hello", "world"], vec!["Page", "two"]]));
        let pdf = extractor("2.0", Arc::clone(&layer));

        let text = pdf.extract(b"%PDF-1.7").await.unwrap();
        assert_eq!(text, "Hello world\nPage two");
        assert_eq!(layer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_retries_without_worker() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![vec!["Recovered", "text"]]));
        let pdf = extractor("1.9", Arc::clone(&layer));

        let text = pdf.extract(b"%PDF-1.7").await.unwrap();
        assert_eq!(text, "Recovered text");
        // The worker refused before reaching the layer; only the retry parsed.
        assert_eq!(layer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mismatch_reported_by_library_message() {
        let message = format!("Setting up worker: {}", WORKER_MISMATCH_MARKER);
        let layer = Arc::new(
            FakeLayer::with_pages("2.0", vec![vec!["ok"]]).failing_first(1, &message),
        );
        let pdf = extractor("2.0", Arc::clone(&layer));

        assert_eq!(pdf.extract(b"%PDF").await.unwrap(), "ok");
        assert_eq!(layer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_happens_once() {
        let message = format!("still {}", WORKER_MISMATCH_MARKER);
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![]).failing_first(5, &message));
        let pdf = extractor("2.0", Arc::clone(&layer));

        assert!(pdf.extract(b"%PDF").await.is_err());
        assert_eq!(layer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_retry() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![]).failing_first(1, "bad xref"));
        let pdf = extractor("2.0", Arc::clone(&layer));

        let err = pdf.extract(b"%PDF").await.unwrap_err();
        assert!(err.to_string().contains("bad xref"));
        assert_eq!(layer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_page_document() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![]));
        let pdf = extractor("2.0", layer);
        assert_eq!(pdf.extract(b"%PDF").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_panic_fails_one_document_only() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![vec!["fine"]]).panicking_first(1));
        let pdf = extractor("2.0", Arc::clone(&layer));

        let err = pdf.extract(b"%PDF").await.unwrap_err();
        assert!(err.to_string().contains("corrupt cross-reference table"));

        assert_eq!(pdf.extract(b"%PDF").await.unwrap(), "fine");
        assert_eq!(layer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dead_worker_falls_back_to_inline() {
        let layer = Arc::new(FakeLayer::with_pages("2.0", vec![vec!["Inline", "text"]]));
        let bootstrap = WorkerBootstrap::new(
            "2.0",
            Arc::clone(&layer) as Arc<dyn PdfTextLayer>,
            Box::new(DeadLoader),
        );
        let pdf = PdfExtractor::new(Arc::new(bootstrap));

        assert_eq!(pdf.extract(b"%PDF").await.unwrap(), "Inline text");
        assert_eq!(pdf.extract(b"%PDF").await.unwrap(), "Inline text");
        assert_eq!(layer.calls.load(Ordering::SeqCst), 2);
    }
}
