//! Access to the encrypted DJ library database.
//!
//! The database file and its schema belong to the DJ software; this module
//! only opens it, reads the handful of tables the tool needs and writes back
//! a narrow set of metadata columns, stamping every touched row with the
//! current update sequence number (USN).

pub mod artists;
mod connection;
pub mod models;
pub mod paths;
pub mod queries;
pub mod schema;
pub mod usn;

pub use connection::{
    apply_library_key, backup_destination, ConnectionError, ConnectionManager, ConnectionStatus,
    LIBRARY_DB_KEY,
};
pub use models::{ContentMetadata, CuePoint, Playlist, Track};

use chrono::{DateTime, Utc};

/// Timestamp format used by the library for `created_at` / `updated_at`.
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

pub(crate) fn format_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(DB_TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn db_timestamp_now() -> String {
    format_db_timestamp(&Utc::now())
}
