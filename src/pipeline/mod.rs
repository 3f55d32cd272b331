//! Intake pipeline
//!
//! Gathers files from disk and reports progress while they are extracted.

pub mod intake;
pub mod progress;

pub use intake::{collect_paths, load_files};
pub use progress::ProgressTracker;
