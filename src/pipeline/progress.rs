//! Progress Tracker for document extraction
//!
//! Shows a progress bar on stderr while a batch of files is extracted.
//! Files finish out of order, so the tracker is shared by reference and
//! counts with atomics.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks and displays progress during extraction
pub struct ProgressTracker {
    /// Number of files extracted so far
    done: AtomicUsize,
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(total_files: usize) -> Self {
        let bar = ProgressBar::new(total_files as u64);
        let style = ProgressStyle::with_template(
            "  {spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
        bar.set_style(style);
        bar.set_message("extracting...");

        Self {
            done: AtomicUsize::new(0),
            bar,
        }
    }

    /// Create a quiet progress tracker (no output)
    pub fn quiet(total_files: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            bar: ProgressBar::with_draw_target(
                Some(total_files as u64),
                ProgressDrawTarget::hidden(),
            ),
        }
    }

    /// Record one extracted file
    pub fn file_done(&self, name: &str) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    /// Number of files extracted so far
    pub fn files_done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Remove the bar once the batch is complete
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Remove the bar after a failed batch
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracker() {
        let tracker = ProgressTracker::quiet(10);

        tracker.file_done("a.pdf");
        tracker.file_done("b.docx");

        assert_eq!(tracker.files_done(), 2);
        tracker.finish();
    }

    #[tokio::test]
    async fn test_concurrent_updates() {
        let tracker = ProgressTracker::quiet(4);

        let names = ["1", "2", "3", "4"];
        futures::future::join_all(names.iter().map(|n| async {
            tokio::task::yield_now().await;
            tracker.file_done(n);
        }))
        .await;

        assert_eq!(tracker.files_done(), 4);
    }
}
