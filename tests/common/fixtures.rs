//! Encrypted test library creation

#![allow(dead_code)]

use super::constants::*;
use crate_sync::library_db::paths::path_to_db_path;
use crate_sync::library_db::schema::create_library_schema;
use crate_sync::library_db::{apply_library_key, ConnectionManager};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Some bytes so that audio files are not skipped as empty.
const FAKE_AUDIO_BYTES: &[u8] = b"fLaC\0\0\0\x22not really audio";

const ROW_TIMESTAMP: &str = "2024-01-01 00:00:00.000 +00:00";

/// An encrypted library file plus a music folder, both inside a temp dir
/// that is removed on drop.
pub struct TestLibrary {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub music_dir: PathBuf,
}

impl TestLibrary {
    /// Empty library with every expected table and the USN registry at [`INITIAL_USN`].
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("master.db");
        let music_dir = dir.path().join("music");
        fs::create_dir_all(&music_dir).expect("Failed to create music dir");

        let conn = Connection::open(&db_path).expect("Failed to create library file");
        apply_library_key(&conn).expect("Failed to key library");
        create_library_schema(&conn, INITIAL_USN).expect("Failed to create schema");
        drop(conn);

        Self {
            dir,
            db_path,
            music_dir,
        }
    }

    /// Library with one album, one artist, three tracks with files on disk,
    /// a playlist folder holding one playlist and a few cues.
    pub fn with_tracks() -> Self {
        let library = Self::new();
        library.insert_artist(ARTIST_1_ID, ARTIST_1_NAME);
        library.insert_album(ALBUM_1_ID, ALBUM_1_NAME, None);

        let one = library.write_audio_file(TRACK_1_FILE);
        let two = library.write_audio_file(TRACK_2_FILE);
        let three = library.write_audio_file(TRACK_3_FILE);
        library.insert_track(TRACK_1_ID, &one, Some(ALBUM_1_ID), Some("2024-01-10"));
        library.insert_track(TRACK_2_ID, &two, None, Some("2024-02-15"));
        library.insert_track(TRACK_3_ID, &three, Some(ALBUM_1_ID), Some("2024-03-20"));

        library.insert_playlist(PLAYLIST_FOLDER_ID, "Gigs", "root", 1, 1);
        library.insert_playlist(PLAYLIST_1_ID, "Warmup", PLAYLIST_FOLDER_ID, 1, 0);
        library.add_to_playlist("1", PLAYLIST_1_ID, TRACK_3_ID, 1);
        library.add_to_playlist("2", PLAYLIST_1_ID, TRACK_1_ID, 2);

        library.insert_cue("c1", TRACK_1_ID, 1500, -1, 0);
        library.insert_cue("c2", TRACK_1_ID, 32000, 48000, 4);
        library
    }

    pub fn manager(&self) -> ConnectionManager {
        ConnectionManager::new(&self.db_path)
    }

    /// Keyed connection that bypasses the manager.
    pub fn raw_connection(&self) -> Connection {
        let conn = Connection::open(&self.db_path).expect("Failed to open library");
        apply_library_key(&conn).expect("Failed to key library");
        conn
    }

    pub fn music_path(&self, relative: &str) -> PathBuf {
        self.music_dir.join(relative)
    }

    pub fn write_audio_file(&self, relative: &str) -> PathBuf {
        self.write_file(relative, FAKE_AUDIO_BYTES)
    }

    pub fn write_file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.music_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create folder");
        }
        fs::write(&path, bytes).expect("Failed to write file");
        path
    }

    pub fn insert_track(&self, id: &str, file: &Path, album_id: Option<&str>, stock_date: Option<&str>) {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.raw_connection()
            .execute(
                "INSERT INTO djmdContent (ID, FolderPath, FileNameL, Title, AlbumID, StockDate, \
                 DJPlayCount, rb_local_usn, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?3, ?4, ?5, 0, 1, ?6, ?6)",
                params![id, path_to_db_path(file), file_name, album_id, stock_date, ROW_TIMESTAMP],
            )
            .expect("Failed to insert track");
    }

    pub fn insert_artist(&self, id: &str, name: &str) {
        self.raw_connection()
            .execute(
                "INSERT INTO djmdArtist (ID, Name, SearchStr, rb_local_usn, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, 1, ?4, ?4)",
                params![id, name, name.to_uppercase(), ROW_TIMESTAMP],
            )
            .expect("Failed to insert artist");
    }

    pub fn insert_album(&self, id: &str, name: &str, album_artist_id: Option<&str>) {
        self.raw_connection()
            .execute(
                "INSERT INTO djmdAlbum (ID, Name, AlbumArtistID, rb_local_usn, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, 1, ?4, ?4)",
                params![id, name, album_artist_id, ROW_TIMESTAMP],
            )
            .expect("Failed to insert album");
    }

    pub fn insert_playlist(&self, id: &str, name: &str, parent_id: &str, seq: i64, attribute: i64) {
        self.raw_connection()
            .execute(
                "INSERT INTO djmdPlaylist (ID, Seq, Name, Attribute, ParentID) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, seq, name, attribute, parent_id],
            )
            .expect("Failed to insert playlist");
    }

    pub fn add_to_playlist(&self, id: &str, playlist_id: &str, content_id: &str, track_no: i64) {
        self.raw_connection()
            .execute(
                "INSERT INTO djmdSongPlaylist (ID, PlaylistID, ContentID, TrackNo) VALUES (?1, ?2, ?3, ?4)",
                params![id, playlist_id, content_id, track_no],
            )
            .expect("Failed to insert playlist entry");
    }

    pub fn insert_cue(&self, id: &str, content_id: &str, in_msec: i64, out_msec: i64, kind: i64) {
        self.raw_connection()
            .execute(
                "INSERT INTO djmdCue (ID, ContentID, InMsec, OutMsec, Kind) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, content_id, in_msec, out_msec, kind],
            )
            .expect("Failed to insert cue");
    }

    /// Makes every update of track `id` fail with a constraint error.
    pub fn reject_content_updates(&self, id: &str) {
        self.raw_connection()
            .execute_batch(&format!(
                "CREATE TRIGGER reject_update_{id} BEFORE UPDATE ON djmdContent \
                 WHEN OLD.ID = '{id}' BEGIN SELECT RAISE(ABORT, 'track is locked'); END;"
            ))
            .expect("Failed to create trigger");
    }

    pub fn current_usn(&self) -> i64 {
        self.raw_connection()
            .query_row(
                "SELECT int_1 FROM agentRegistry WHERE registry_id = 'localUpdateCount'",
                [],
                |row| row.get(0),
            )
            .expect("Failed to read USN")
    }

    /// Text value of `column` for track `id`.
    pub fn content_value(&self, id: &str, column: &str) -> Option<String> {
        self.raw_connection()
            .query_row(
                &format!("SELECT {} FROM djmdContent WHERE ID = ?1", column),
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .expect("Failed to read track")
            .flatten()
    }

    pub fn content_usn(&self, id: &str) -> Option<i64> {
        self.raw_connection()
            .query_row(
                "SELECT rb_local_usn FROM djmdContent WHERE ID = ?1",
                params![id],
                |row| row.get(0),
            )
            .expect("Failed to read track USN")
    }

    pub fn album_artist_id(&self, album_id: &str) -> Option<String> {
        self.raw_connection()
            .query_row(
                "SELECT AlbumArtistID FROM djmdAlbum WHERE ID = ?1",
                params![album_id],
                |row| row.get(0),
            )
            .expect("Failed to read album")
    }

    pub fn artist_name(&self, id: &str) -> Option<String> {
        self.raw_connection()
            .query_row(
                "SELECT Name FROM djmdArtist WHERE ID = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .expect("Failed to read artist")
    }

    pub fn artist_count(&self) -> i64 {
        self.raw_connection()
            .query_row("SELECT COUNT(*) FROM djmdArtist", [], |row| row.get(0))
            .expect("Failed to count artists")
    }

    /// Backups created next to the library file.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut backups: Vec<PathBuf> = fs::read_dir(self.dir.path())
            .expect("Failed to list temp dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().starts_with("master.db.backup-"))
                    .unwrap_or(false)
            })
            .collect();
        backups.sort();
        backups
    }
}
