//! PDF background worker
//!
//! PDF parsing is offloaded to a dedicated thread. The thread is started
//! lazily, once per [`WorkerBootstrap`], by whichever extraction needs it
//! first; concurrent callers wait on the same start-up.
//!
//! The worker is pinned to a version string when it is spawned. The
//! bootstrap has no way to check that pin against the PDF text layer, so a
//! mismatch only shows up when a document is opened on the worker.

use async_trait::async_trait;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tracing::{debug, info, warn};

use super::pdf::{PageFragments, PdfTextLayer};
use super::ExtractionError;

/// Lifecycle of the background worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Initializing,
    Ready,
}

/// A parse request sent to the worker thread
struct Job {
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<Vec<PageFragments>, ExtractionError>>,
}

/// Handle to a running worker thread
pub struct PdfWorker {
    version: String,
    jobs: mpsc::UnboundedSender<Job>,
}

impl PdfWorker {
    /// Version the worker was pinned to
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Parse a document on the worker thread.
    pub async fn open(&self, bytes: Vec<u8>) -> Result<Vec<PageFragments>, ExtractionError> {
        let (reply, response) = oneshot::channel();

        self.jobs
            .send(Job { bytes, reply })
            .map_err(|_| ExtractionError::WorkerUnavailable("worker thread has exited".into()))?;

        response
            .await
            .map_err(|_| ExtractionError::WorkerUnavailable("worker dropped the request".into()))?
    }
}

/// Starts worker threads
#[async_trait]
pub trait WorkerLoader: Send + Sync {
    async fn load(
        &self,
        version: &str,
        layer: Arc<dyn PdfTextLayer>,
    ) -> Result<PdfWorker, ExtractionError>;
}

/// Spawns a named OS thread that serves parse requests until every handle
/// to it is dropped.
pub struct ThreadLoader;

#[async_trait]
impl WorkerLoader for ThreadLoader {
    async fn load(
        &self,
        version: &str,
        layer: Arc<dyn PdfTextLayer>,
    ) -> Result<PdfWorker, ExtractionError> {
        let (jobs, queue) = mpsc::unbounded_channel();
        let (started, on_start) = oneshot::channel();
        let pinned = version.to_string();

        std::thread::Builder::new()
            .name("folio-pdf-worker".to_string())
            .spawn(move || {
                let _ = started.send(());
                serve(pinned, layer, queue);
            })
            .map_err(|e| ExtractionError::WorkerUnavailable(e.to_string()))?;

        on_start.await.map_err(|_| {
            ExtractionError::WorkerUnavailable("worker thread exited during start-up".into())
        })?;

        Ok(PdfWorker {
            version: version.to_string(),
            jobs,
        })
    }
}

/// Worker thread body
fn serve(version: String, layer: Arc<dyn PdfTextLayer>, mut queue: mpsc::UnboundedReceiver<Job>) {
    debug!(version = %version, "PDF worker started");

    while let Some(job) = queue.blocking_recv() {
        let result = if layer.version() != version {
            Err(ExtractionError::WorkerVersionMismatch {
                api: layer.version().to_string(),
                worker: version.clone(),
            })
        } else {
            parse_guarded(layer.as_ref(), &job.bytes)
        };

        // The requester may have given up; nothing to do then.
        let _ = job.reply.send(result);
    }

    debug!("PDF worker stopped");
}

/// Run the text layer, turning a panic into an error so one bad document
/// cannot take the thread down.
fn parse_guarded(
    layer: &dyn PdfTextLayer,
    bytes: &[u8],
) -> Result<Vec<PageFragments>, ExtractionError> {
    panic::catch_unwind(AssertUnwindSafe(|| layer.pages(bytes))).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(reason = %reason, "PDF text layer panicked on the worker");
        Err(ExtractionError::pdf(format!("text layer panicked: {}", reason)))
    })
}

/// Clears the start-up flag when the start-up future finishes or is dropped.
struct Initializing<'a>(&'a AtomicBool);

impl<'a> Initializing<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for Initializing<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One-shot, single-flight start-up of the PDF worker.
pub struct WorkerBootstrap {
    version: String,
    layer: Arc<dyn PdfTextLayer>,
    loader: Box<dyn WorkerLoader>,
    worker: OnceCell<Arc<PdfWorker>>,
    initializing: AtomicBool,
}

impl WorkerBootstrap {
    /// Bootstrap that pins the worker to `version`.
    pub fn new(
        version: impl Into<String>,
        layer: Arc<dyn PdfTextLayer>,
        loader: Box<dyn WorkerLoader>,
    ) -> Self {
        Self {
            version: version.into(),
            layer,
            loader,
            worker: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// The version the worker is (or will be) pinned to
    pub fn pinned_version(&self) -> &str {
        &self.version
    }

    /// The text layer, for parsing without the worker
    pub fn layer(&self) -> Arc<dyn PdfTextLayer> {
        Arc::clone(&self.layer)
    }

    pub fn state(&self) -> WorkerState {
        if self.worker.initialized() {
            WorkerState::Ready
        } else if self.initializing.load(Ordering::Acquire) {
            WorkerState::Initializing
        } else {
            WorkerState::Uninitialized
        }
    }

    /// Start the worker if it is not running yet and return it.
    ///
    /// Only the first successful call starts a thread. A failed start
    /// leaves the bootstrap uninitialised so a later call can try again.
    pub async fn ensure_ready(&self) -> Result<Arc<PdfWorker>, ExtractionError> {
        let worker = self
            .worker
            .get_or_try_init(|| async {
                let flag = Initializing::enter(&self.initializing);
                let loaded = self.loader.load(&self.version, Arc::clone(&self.layer)).await;
                drop(flag);

                match loaded {
                    Ok(worker) => {
                        info!(version = %self.version, "PDF worker ready");
                        Ok(Arc::new(worker))
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to start PDF worker");
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(Arc::clone(worker))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::pdf::tests::FakeLayer;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Wraps the thread loader and counts how often it is asked to start.
    struct CountingLoader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WorkerLoader for CountingLoader {
        async fn load(
            &self,
            version: &str,
            layer: Arc<dyn PdfTextLayer>,
        ) -> Result<PdfWorker, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            ThreadLoader.load(version, layer).await
        }
    }

    struct FailingLoader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WorkerLoader for FailingLoader {
        async fn load(
            &self,
            _version: &str,
            _layer: Arc<dyn PdfTextLayer>,
        ) -> Result<PdfWorker, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionError::WorkerUnavailable("no threads left".into()))
        }
    }

    /// Hands out a worker whose thread is already gone.
    pub(crate) struct DeadLoader;

    #[async_trait]
    impl WorkerLoader for DeadLoader {
        async fn load(
            &self,
            version: &str,
            _layer: Arc<dyn PdfTextLayer>,
        ) -> Result<PdfWorker, ExtractionError> {
            let (jobs, _) = mpsc::unbounded_channel();
            Ok(PdfWorker {
                version: version.to_string(),
                jobs,
            })
        }
    }

    /// Never finishes starting.
    struct StuckLoader;

    #[async_trait]
    impl WorkerLoader for StuckLoader {
        async fn load(
            &self,
            _version: &str,
            _layer: Arc<dyn PdfTextLayer>,
        ) -> Result<PdfWorker, ExtractionError> {
            std::future::pending().await
        }
    }

    fn counting_bootstrap(version: &str) -> (WorkerBootstrap, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let bootstrap = WorkerBootstrap::new(
            version,
            Arc::new(FakeLayer::with_pages("1.0.0", vec![vec!["hi"]])),
            Box::new(CountingLoader { calls: Arc::clone(&calls) }),
        );
        (bootstrap, calls)
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let (bootstrap, calls) = counting_bootstrap("1.0.0");
        assert_eq!(bootstrap.state(), WorkerState::Uninitialized);

        bootstrap.ensure_ready().await.unwrap();
        bootstrap.ensure_ready().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bootstrap.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_start() {
        let (bootstrap, calls) = counting_bootstrap("1.0.0");

        let (a, b, c) = tokio::join!(
            bootstrap.ensure_ready(),
            bootstrap.ensure_ready(),
            bootstrap.ensure_ready()
        );

        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_start_can_be_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let bootstrap = WorkerBootstrap::new(
            "1.0.0",
            Arc::new(FakeLayer::with_pages("1.0.0", vec![])),
            Box::new(FailingLoader { calls: Arc::clone(&calls) }),
        );

        assert!(bootstrap.ensure_ready().await.is_err());
        assert_eq!(bootstrap.state(), WorkerState::Uninitialized);
        assert!(bootstrap.ensure_ready().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_worker_parses_when_versions_match() {
        let (bootstrap, _) = counting_bootstrap("1.0.0");
        let worker = bootstrap.ensure_ready().await.unwrap();

        let pages = worker.open(b"%PDF".to_vec()).await.unwrap();
        assert_eq!(pages, vec![vec!["hi".to_string()]]);
        assert_eq!(worker.version(), "1.0.0");
    }

    #[tokio::test]
    async fn test_mismatch_surfaces_on_open_not_on_start() {
        let (bootstrap, _) = counting_bootstrap("0.9.0");

        let worker = bootstrap.ensure_ready().await.unwrap();
        assert_eq!(bootstrap.pinned_version(), "0.9.0");
        let err = worker.open(b"%PDF".to_vec()).await.unwrap_err();

        assert!(err.is_worker_mismatch());
        assert!(err.to_string().contains("\"0.9.0\""));
    }

    #[tokio::test]
    async fn test_abandoned_start_resets_state() {
        let bootstrap = WorkerBootstrap::new(
            "1.0.0",
            Arc::new(FakeLayer::with_pages("1.0.0", vec![])),
            Box::new(StuckLoader),
        );

        let attempt =
            tokio::time::timeout(Duration::from_millis(20), bootstrap.ensure_ready()).await;
        assert!(attempt.is_err());
        assert_eq!(bootstrap.state(), WorkerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_panicking_layer_keeps_worker_alive() {
        let layer =
            Arc::new(FakeLayer::with_pages("1.0.0", vec![vec!["fine"]]).panicking_first(1));
        let bootstrap = WorkerBootstrap::new(
            "1.0.0",
            Arc::clone(&layer) as Arc<dyn PdfTextLayer>,
            Box::new(ThreadLoader),
        );
        let worker = bootstrap.ensure_ready().await.unwrap();

        let err = worker.open(b"%PDF".to_vec()).await.unwrap_err();
        assert!(err.to_string().contains("text layer panicked"));

        let pages = worker.open(b"%PDF".to_vec()).await.unwrap();
        assert_eq!(pages, vec![vec!["fine".to_string()]]);
        assert_eq!(layer.calls.load(Ordering::SeqCst), 2);
    }
}
