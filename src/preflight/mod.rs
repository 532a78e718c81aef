//! Checks run before an action is allowed to start.

mod probe;
mod validator;

pub use probe::probe_writable;
pub use validator::{PreflightReport, Validator};

use crate::library_db::ConnectionError;
use std::path::PathBuf;
use thiserror::Error;

/// First rule that failed. Validation stops there.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Please select a folder for \"{0}\"")]
    FolderRequired(String),

    #[error("Please select a playlist for \"{0}\"")]
    PlaylistRequired(String),

    #[error("Please enter a date for \"{0}\"")]
    DateRequired(String),

    #[error("\"{0}\" is required")]
    FieldRequired(String),

    #[error("\"{key}\" is not a valid date (expected YYYY-MM-DD): {value}")]
    InvalidDate { key: String, value: String },

    #[error("\"{key}\" does not exist: {path:?}")]
    NotFound { key: String, path: PathBuf },

    #[error("\"{key}\" is not writable: {path:?}: {source}")]
    NotWritable {
        key: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No library database path configured")]
    DatabasePathNotSet,

    #[error("Library database not found: {0:?}")]
    DatabaseMissing(PathBuf),

    #[error("Library database is empty (0 bytes): {0:?}")]
    DatabaseEmpty(PathBuf),

    #[error("Library database folder is not writable: {path:?}: {source}")]
    DatabaseDirNotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot connect to library database: {0}")]
    Connection(#[source] ConnectionError),

    #[error("Library database backup failed: {0}")]
    Backup(#[source] ConnectionError),
}
