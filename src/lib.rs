//! Crate Sync Library
//!
//! Keeps the metadata of an encrypted DJ library database in step with the
//! tags of the audio files it references. Exposed as a library for the
//! command line binary and for integration tests.

pub mod config;
pub mod library_db;
pub mod preflight;
pub mod reconcile;
pub mod report;

// Re-export commonly used types for convenience
pub use config::{CliConfig, ModuleKind, Settings};
pub use library_db::{ConnectionError, ConnectionManager};
pub use preflight::{PreflightError, PreflightReport, Validator};
pub use reconcile::{
    process_folder_metadata, LoftyTagReader, ReconcileError, ReconcileObserver, ReconcileOutcome,
    ReconcileRequest, ReconcileSummary,
};
pub use report::{build_tracks_report, write_report, ReportError, ReportRequest};
