//! Read-only export of library tracks to a JSON file.

mod request;
mod tracks;

pub use request::{ReportRequest, TrackSource};
pub use tracks::{build_tracks_report, report_file_name, write_report, ReportTrack, TracksReport};

use crate::library_db::ConnectionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unknown track source {0:?} (expected \"folder\" or \"playlist\")")]
    InvalidSource(String),

    #[error("\"{0}\" must be set")]
    MissingValue(String),

    #[error("\"{key}\" is not a valid date (expected YYYY-MM-DD): {value}")]
    InvalidDate { key: String, value: String },

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<rusqlite::Error> for ReportError {
    fn from(e: rusqlite::Error) -> Self {
        ReportError::Connection(ConnectionError::Sqlite(e))
    }
}
