//! Conversion between filesystem paths and the path strings stored in the library.
//!
//! The library always stores forward slashes. Folder prefixes additionally
//! carry a trailing slash so that `/music/a` never matches `/music/ab/...`.

use std::path::Path;

/// Normalizes a file path to the form stored in `djmdContent.FolderPath`.
pub fn normalize_db_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalizes a folder path to a prefix usable against stored paths.
pub fn normalize_db_folder(path: &str) -> String {
    let mut normalized = normalize_db_path(path);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

pub fn path_to_db_path(path: &Path) -> String {
    normalize_db_path(&path.to_string_lossy())
}

pub fn folder_to_db_folder(path: &Path) -> String {
    normalize_db_folder(&path.to_string_lossy())
}
