//! Corpus discovery.
//!
//! Lists the input files a harness run will feed to the processor: the
//! regular files directly inside a directory whose extension is on an
//! allow-list. Subdirectories are not descended into, and entries that are
//! not files (directories, dangling symlinks) are skipped.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::HarnessError;

/// Extensions the processor understands, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "json", "csv", "pdf", "docx"];

/// Discover corpus files with the default extension allow-list.
pub fn discover_corpus(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    discover_with(dir, SUPPORTED_EXTENSIONS)
}

/// Discover files in `dir` whose extension (case-insensitive) is in
/// `extensions`. Results are sorted by path.
pub fn discover_with(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, HarnessError> {
    if !dir.is_dir() {
        return Err(HarnessError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);
    for entry in walker {
        // A dangling symlink surfaces as an error once links are followed.
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if has_extension(path, extensions) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}
