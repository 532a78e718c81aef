//! Folder metadata sync: copies embedded tag values onto library tracks.

mod files;
mod pipeline;
mod summary;
pub mod tags;

pub use files::{enumerate_audio_files, FileScan, DEFAULT_AUDIO_EXTENSIONS};
pub use pipeline::{
    process_folder_metadata, NoopObserver, ReconcileObserver, ReconcileRequest,
};
pub use summary::{ReconcileOutcome, ReconcileSummary};
pub use tags::{LoftyTagReader, TagError, TagMap, TagReader};

use crate::library_db::ConnectionError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a batch as a whole. Per-file problems are counted instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No audio files found in {0:?}")]
    NoFiles(PathBuf),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
