use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}

/// Fail with [`ConvertError::MissingDirectory`] unless `path` is an existing directory
pub fn require_directory(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(ConvertError::MissingDirectory(path.to_path_buf()))
    }
}

/// Create the directory if needed, keeping whatever it already holds
pub fn ensure_directory(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Files directly inside `dir` with the given extension, sorted by path
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/*.{}", escaped, extension);
    let mut entries: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Move a file, falling back to copy and delete when a rename is not possible
pub fn move_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)?;
    fs::remove_file(src)
}
