//! Typed reads over the library tables.

use super::models::{ContentMetadata, CuePoint, Playlist, Track};
use super::paths::normalize_db_folder;
use super::schema::{ALBUM_TABLE, CONTENT_TABLE, CUE_TABLE, PLAYLIST_TABLE, SONG_PLAYLIST_TABLE};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Parent id the DJ software uses for top level playlists.
const ROOT_PLAYLIST_ID: &str = "root";

/// `Attribute` value of playlist folders.
const PLAYLIST_FOLDER_ATTRIBUTE: i64 = 1;

const TRACK_COLUMNS: &str = "ID, FolderPath, FileNameL, Title, StockDate, DateCreated, ColorID, DJPlayCount, AlbumID";

/// Treats an empty reference or comparison value as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn row_to_track(row: &Row) -> rusqlite::Result<Track> {
    // Some library versions store the play count as text.
    let play_count = match row.get::<_, Option<i64>>("DJPlayCount") {
        Ok(count) => count,
        Err(_) => row
            .get::<_, Option<String>>("DJPlayCount")?
            .and_then(|s| s.trim().parse().ok()),
    };

    Ok(Track {
        id: row.get("ID")?,
        folder_path: row.get::<_, Option<String>>("FolderPath")?.unwrap_or_default(),
        file_name: row.get::<_, Option<String>>("FileNameL")?.unwrap_or_default(),
        // NULL is absent, '' is a stored value.
        title: row.get("Title")?,
        stock_date: row.get("StockDate")?,
        created_date: row.get("DateCreated")?,
        color_id: row.get("ColorID")?,
        play_count,
        album_id: non_empty(row.get("AlbumID")?),
    })
}

/// Tracks whose stored path lies under `folder`, ordered by path.
pub fn tracks_in_folder(conn: &Connection, folder: &str) -> rusqlite::Result<Vec<Track>> {
    let prefix = normalize_db_folder(folder);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} \
         WHERE substr(FolderPath, 1, length(?1)) = ?1 AND COALESCE(rb_local_deleted, 0) = 0 \
         ORDER BY FolderPath",
        TRACK_COLUMNS, CONTENT_TABLE
    ))?;
    let rows = stmt.query_map(params![prefix], row_to_track)?;
    rows.collect()
}

/// Maps the stored path of every track under `folder` to its id.
pub fn track_path_index(conn: &Connection, folder: &str) -> rusqlite::Result<HashMap<String, String>> {
    let prefix = normalize_db_folder(folder);
    let mut stmt = conn.prepare(&format!(
        "SELECT ID, FolderPath FROM {} \
         WHERE substr(FolderPath, 1, length(?1)) = ?1 AND COALESCE(rb_local_deleted, 0) = 0",
        CONTENT_TABLE
    ))?;
    let rows = stmt.query_map(params![prefix], |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, String>(0)?))
    })?;
    rows.collect()
}

pub fn track_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Track>> {
    conn.query_row(
        &format!("SELECT {} FROM {} WHERE ID = ?1", TRACK_COLUMNS, CONTENT_TABLE),
        params![id],
        row_to_track,
    )
    .optional()
}

/// Tracks of a playlist in playlist order.
pub fn tracks_in_playlist(conn: &Connection, playlist_id: &str) -> rusqlite::Result<Vec<Track>> {
    let columns = TRACK_COLUMNS
        .split(", ")
        .map(|c| format!("c.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} sp JOIN {} c ON c.ID = sp.ContentID \
         WHERE sp.PlaylistID = ?1 AND COALESCE(sp.rb_local_deleted, 0) = 0 \
         AND COALESCE(c.rb_local_deleted, 0) = 0 \
         ORDER BY sp.TrackNo",
        columns, SONG_PLAYLIST_TABLE, CONTENT_TABLE
    ))?;
    let rows = stmt.query_map(params![playlist_id], row_to_track)?;
    rows.collect()
}

/// Playlist row as stored, before the tree order is applied.
#[derive(Debug, Clone)]
pub struct PlaylistRow {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub seq: i64,
    pub attribute: i64,
}

/// Orders playlists as a tree: siblings by `seq`, every parent right before its children.
///
/// Rows whose parent is unknown are treated as top level.
pub fn order_playlists(rows: Vec<PlaylistRow>) -> Vec<Playlist> {
    let names: HashMap<String, String> = rows
        .iter()
        .map(|row| (row.id.clone(), row.name.clone()))
        .collect();

    let mut children: HashMap<Option<String>, Vec<PlaylistRow>> = HashMap::new();
    for mut row in rows {
        row.parent_id = row
            .parent_id
            .filter(|parent| parent != ROOT_PLAYLIST_ID && names.contains_key(parent));
        children.entry(row.parent_id.clone()).or_default().push(row);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));
    }

    let mut ordered = Vec::with_capacity(names.len());
    let mut stack: Vec<PlaylistRow> = children
        .remove(&None)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .collect();
    while let Some(row) = stack.pop() {
        if let Some(kids) = children.remove(&Some(row.id.clone())) {
            stack.extend(kids.into_iter().rev());
        }
        let display_path = match row.parent_id.as_ref().and_then(|p| names.get(p)) {
            Some(parent_name) => format!("{} > {}", parent_name, row.name),
            None => row.name.clone(),
        };
        ordered.push(Playlist {
            is_folder: row.attribute == PLAYLIST_FOLDER_ATTRIBUTE,
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            seq: row.seq,
            display_path,
        });
    }
    ordered
}

/// All live playlists in tree order.
pub fn playlists(conn: &Connection) -> rusqlite::Result<Vec<Playlist>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT ID, Name, ParentID, Seq, Attribute FROM {} WHERE COALESCE(rb_local_deleted, 0) = 0",
        PLAYLIST_TABLE
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PlaylistRow {
                id: row.get(0)?,
                name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                parent_id: non_empty(row.get(2)?),
                seq: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                attribute: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(order_playlists(rows))
}

pub fn cues_for_track(conn: &Connection, content_id: &str) -> rusqlite::Result<Vec<CuePoint>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT ID, ContentID, InMsec, OutMsec, Kind, Comment FROM {} \
         WHERE ContentID = ?1 AND COALESCE(rb_local_deleted, 0) = 0 \
         ORDER BY InMsec, ID",
        CUE_TABLE
    ))?;
    let rows = stmt.query_map(params![content_id], |row| {
        Ok(CuePoint {
            id: row.get(0)?,
            content_id: row.get(1)?,
            in_msec: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            out_msec: row.get::<_, Option<i64>>(3)?.filter(|v| *v >= 0),
            kind: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            comment: row.get(5)?,
        })
    })?;
    rows.collect()
}

/// Current values of the columns the metadata sync writes, or `None` if the track is gone.
pub fn content_metadata(conn: &Connection, track_id: &str) -> rusqlite::Result<Option<ContentMetadata>> {
    conn.query_row(
        &format!(
            "SELECT c.AlbumID, a.AlbumArtistID, c.OrgArtistID, c.ReleaseDate, c.Subtitle \
             FROM {} c LEFT JOIN {} a ON a.ID = c.AlbumID WHERE c.ID = ?1",
            CONTENT_TABLE, ALBUM_TABLE
        ),
        params![track_id],
        |row| {
            // The sync writes a value only when it differs, and an empty column counts as unset.
            Ok(ContentMetadata {
                album_id: non_empty(row.get(0)?),
                album_artist_id: non_empty(row.get(1)?),
                original_artist_id: non_empty(row.get(2)?),
                release_date: non_empty(row.get(3)?),
                subtitle: non_empty(row.get(4)?),
            })
        },
    )
    .optional()
}
