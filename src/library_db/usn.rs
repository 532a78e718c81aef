//! Update sequence number allocation.
//!
//! The DJ software tracks local changes through a single counter stored in
//! `agentRegistry`. Every row written by this tool carries the value
//! allocated for the batch that wrote it.

use super::connection::ConnectionError;
use super::schema::REGISTRY_TABLE;
use rusqlite::{params, Connection, OptionalExtension};

pub const USN_REGISTRY_ID: &str = "localUpdateCount";

/// Increments the counter and returns the new value.
///
/// This is an update followed by a separate read, not an atomic
/// read-modify-write. Callers must guarantee a single writer per store,
/// which holds as long as one batch runs at a time per
/// [`super::ConnectionManager`] and the DJ software is closed.
pub fn next_usn(conn: &Connection) -> Result<i64, ConnectionError> {
    let updated = conn.execute(
        &format!(
            "UPDATE {} SET int_1 = COALESCE(int_1, 0) + 1, updated_at = ?2 WHERE registry_id = ?1",
            REGISTRY_TABLE
        ),
        params![USN_REGISTRY_ID, super::db_timestamp_now()],
    )?;
    if updated == 0 {
        return Err(ConnectionError::UsnRegistryMissing);
    }
    current_usn(conn)
}

pub fn current_usn(conn: &Connection) -> Result<i64, ConnectionError> {
    conn.query_row(
        &format!("SELECT int_1 FROM {} WHERE registry_id = ?1", REGISTRY_TABLE),
        params![USN_REGISTRY_ID],
        |row| row.get::<_, Option<i64>>(0),
    )
    .optional()?
    .map(|value| value.unwrap_or(0))
    .ok_or(ConnectionError::UsnRegistryMissing)
}
