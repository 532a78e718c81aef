//! Get-or-create resolution of artists referenced by audio tags.

use super::connection::ConnectionError;
use super::schema::ARTIST_TABLE;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

/// Finds a live artist whose name matches `name` ignoring case.
pub fn find_artist(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        &format!(
            "SELECT ID FROM {} WHERE Name = ?1 COLLATE NOCASE AND COALESCE(rb_local_deleted, 0) = 0 \
             ORDER BY CAST(ID AS INTEGER) LIMIT 1",
            ARTIST_TABLE
        ),
        params![name],
        |row| row.get(0),
    )
    .optional()
}

fn next_artist_id(conn: &Connection) -> rusqlite::Result<String> {
    let max_id: i64 = conn.query_row(
        &format!(
            "SELECT COALESCE(MAX(CAST(ID AS INTEGER)), 0) FROM {}",
            ARTIST_TABLE
        ),
        [],
        |row| row.get(0),
    )?;
    Ok((max_id + 1).to_string())
}

/// Returns the id of the artist called `name`, inserting it stamped with `usn` if needed.
///
/// A blank name resolves to `None` without touching the database. The
/// lookup and the insert are separate statements and the new id is
/// `max(id) + 1`, so two concurrent writers could race; callers run under
/// the same single-writer rule as [`super::usn::next_usn`].
pub fn add_or_get_artist(
    conn: &Connection,
    name: &str,
    usn: i64,
) -> Result<Option<String>, ConnectionError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(id) = find_artist(conn, name)? {
        return Ok(Some(id));
    }

    let id = next_artist_id(conn)?;
    let now = super::db_timestamp_now();
    conn.execute(
        &format!(
            "INSERT INTO {} (ID, Name, SearchStr, UUID, rb_local_usn, rb_local_deleted, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
            ARTIST_TABLE
        ),
        params![
            id,
            name,
            name.to_uppercase(),
            Uuid::new_v4().to_string(),
            usn,
            now
        ],
    )?;
    debug!(
        module = "library_db",
        operation = "add_or_get_artist",
        "Created artist {} ({})",
        id,
        name
    );
    Ok(Some(id))
}
