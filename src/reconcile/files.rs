//! Discovery of candidate audio files under a folder.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Audio extensions the DJ software can import.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] =
    &["mp3", "m4a", "aac", "flac", "wav", "aif", "aiff", "alac", "ogg"];

#[derive(Debug, Default)]
pub struct FileScan {
    /// Matching files, in file-name order within each directory.
    pub files: Vec<PathBuf>,
    /// Directories (or entries) that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Lists files under `root` whose extension is in `extensions` (case-insensitive).
///
/// Unreadable directories are reported in [`FileScan::skipped`] and the walk
/// carries on with their siblings.
pub fn enumerate_audio_files(root: &Path, extensions: &[String], recursive: bool) -> FileScan {
    let mut scan = FileScan::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                    scan.files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(
                    module = "reconcile",
                    operation = "enumerate",
                    "Skipping unreadable entry {:?}: {}",
                    path,
                    e
                );
                scan.skipped.push((path, e.to_string()));
            }
        }
    }
    scan
}
