//! File intake
//!
//! Resolves the paths given on the command line into a list of documents.
//! Files are taken as given, whatever their type. Directories are walked
//! for supported extensions in sorted order.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract::sniff::is_supported_path;
use crate::types::UploadedFile;

/// Expand files and directories into a list of file paths.
pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_file() {
            paths.push(input.clone());
        } else if input.is_dir() {
            paths.extend(walk_dir(input));
        } else {
            bail!("No such file or directory: {}", input.display());
        }
    }

    Ok(paths)
}

fn walk_dir(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_supported_path(p))
        .collect()
}

/// Read every input into memory, in order.
pub fn load_files(inputs: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    collect_paths(inputs)?
        .iter()
        .map(|p| UploadedFile::from_path(p))
        .collect()
}
