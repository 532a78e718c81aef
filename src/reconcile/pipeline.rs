use super::files::{enumerate_audio_files, DEFAULT_AUDIO_EXTENSIONS};
use super::summary::{ReconcileOutcome, ReconcileSummary};
use super::tags::{self, TagMap, TagReader};
use super::ReconcileError;
use crate::library_db::paths::{folder_to_db_folder, path_to_db_path};
use crate::library_db::schema::{ALBUM_TABLE, CONTENT_TABLE};
use crate::library_db::{artists, db_timestamp_now, queries, ConnectionError, ConnectionManager};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a metadata sync run should look at.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub folder: PathBuf,
    pub recursive: bool,
    pub extensions: Vec<String>,
}

impl ReconcileRequest {
    pub fn new<P: Into<PathBuf>>(folder: P) -> Self {
        Self {
            folder: folder.into(),
            recursive: true,
            extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

/// Receives progress from a running batch.
///
/// Both methods are called from the worker running the batch.
pub trait ReconcileObserver: Send + Sync {
    fn on_files_found(&self, _total: usize) {}

    /// `fraction` goes from 0 to 1; `updated` is the running count of updated files.
    fn on_progress(&self, _fraction: f64, _updated: usize, _total: usize) {}
}

pub struct NoopObserver;

impl ReconcileObserver for NoopObserver {}

/// Result of applying one file's tags to its track.
#[derive(Debug, Default)]
struct FileUpdate {
    changed: Vec<&'static str>,
    not_updated: Vec<&'static str>,
}

enum FileResult {
    Updated,
    NoChange,
    SkippedZero,
    MetadataError,
    DbMiss,
    DbUpdateError,
}

/// Writes the tag values present in `fields` onto track `track_id`, stamping rows with `usn`.
///
/// Must run inside a transaction: a failure part way leaves earlier
/// statements to be rolled back by the caller.
fn apply_tags(
    conn: &Connection,
    track_id: &str,
    fields: &TagMap,
    usn: i64,
) -> Result<FileUpdate, ConnectionError> {
    let current = queries::content_metadata(conn, track_id)?
        .ok_or(ConnectionError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
    let now = db_timestamp_now();
    let mut update = FileUpdate::default();

    match (tags::tag_value(fields, tags::ALBUM_ARTIST), &current.album_id) {
        (Some(name), Some(album_id)) => {
            let artist_id = artists::add_or_get_artist(conn, name, usn)?;
            if artist_id != current.album_artist_id {
                conn.execute(
                    &format!(
                        "UPDATE {} SET AlbumArtistID = ?1, rb_local_usn = ?2, updated_at = ?3 WHERE ID = ?4",
                        ALBUM_TABLE
                    ),
                    params![artist_id, usn, now, album_id],
                )?;
                update.changed.push("album_artist");
            }
        }
        // Albums are never created here, so the album artist has nowhere to go.
        (Some(_), None) => update.not_updated.push("album_artist (no album)"),
        (None, _) => update.not_updated.push("album_artist"),
    }

    let mut content_changes: Vec<(&'static str, Value)> = Vec::new();

    match tags::tag_value(fields, tags::ORIGINAL_ARTIST) {
        Some(name) => {
            let artist_id = artists::add_or_get_artist(conn, name, usn)?;
            if let Some(id) =
                artist_id.filter(|id| current.original_artist_id.as_ref() != Some(id))
            {
                content_changes.push(("OrgArtistID", Value::Text(id)));
                update.changed.push("original_artist");
            }
        }
        None => update.not_updated.push("original_artist"),
    }

    let text_fields = [
        (tags::RELEASE_DATE, "ReleaseDate", "release_date", &current.release_date),
        (tags::SUBTITLE, "Subtitle", "subtitle", &current.subtitle),
    ];
    for (tag_key, column, label, current_value) in text_fields {
        match tags::tag_value(fields, tag_key) {
            Some(value) if current_value.as_deref() != Some(value) => {
                content_changes.push((column, Value::Text(value.to_string())));
                update.changed.push(label);
            }
            Some(_) => {}
            None => update.not_updated.push(label),
        }
    }

    if !content_changes.is_empty() {
        let assignments = content_changes
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let n = content_changes.len();
        let sql = format!(
            "UPDATE {} SET {}, rb_local_usn = ?{}, updated_at = ?{} WHERE ID = ?{}",
            CONTENT_TABLE,
            assignments,
            n + 1,
            n + 2,
            n + 3
        );
        let values = content_changes
            .into_iter()
            .map(|(_, value)| value)
            .chain([
                Value::Integer(usn),
                Value::Text(now),
                Value::Text(track_id.to_string()),
            ]);
        conn.execute(&sql, params_from_iter(values))?;
    }

    Ok(update)
}

fn process_file(
    db: &ConnectionManager,
    reader: &dyn TagReader,
    path: &Path,
    index: &HashMap<String, String>,
    usn: i64,
) -> FileResult {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => {}
        Ok(_) => {
            debug!(module = "reconcile", operation = "stat", "Skipping empty file {:?}", path);
            return FileResult::SkippedZero;
        }
        Err(e) => {
            warn!(module = "reconcile", operation = "stat", "Cannot stat {:?}: {}", path, e);
            return FileResult::SkippedZero;
        }
    }

    let db_path = path_to_db_path(path);
    let track_id = match index.get(&db_path) {
        Some(id) => id,
        None => {
            debug!(module = "reconcile", operation = "lookup", "Not in library: {}", db_path);
            return FileResult::DbMiss;
        }
    };

    let fields = match reader.read_tags(path) {
        Ok(fields) => fields,
        Err(e) => {
            warn!(module = "reconcile", operation = "read_tags", "Cannot read tags of {:?}: {}", path, e);
            return FileResult::MetadataError;
        }
    };

    match db.with_transaction(|conn| apply_tags(conn, track_id, &fields, usn)) {
        Ok(update) => {
            if !update.not_updated.is_empty() {
                debug!(
                    module = "reconcile",
                    operation = "apply_tags",
                    "Track {}: not updated: {}",
                    track_id,
                    update.not_updated.join(", ")
                );
            }
            if update.changed.is_empty() {
                FileResult::NoChange
            } else {
                debug!(
                    module = "reconcile",
                    operation = "apply_tags",
                    "Track {}: updated {}",
                    track_id,
                    update.changed.join(", ")
                );
                FileResult::Updated
            }
        }
        Err(e) => {
            warn!(module = "reconcile", operation = "apply_tags", "Failed to update track {}: {}", track_id, e);
            FileResult::DbUpdateError
        }
    }
}

/// Copies tag metadata from the files under `request.folder` onto their library tracks.
///
/// Files are handled one at a time in enumeration order. Failures of a
/// single file are counted in the summary and never stop the batch. The
/// whole batch shares one USN. `cancel` is checked before the batch starts
/// writing and before each file; a file that has started is always
/// finished.
pub fn process_folder_metadata(
    db: &ConnectionManager,
    reader: &dyn TagReader,
    request: &ReconcileRequest,
    observer: &dyn ReconcileObserver,
    cancel: &CancellationToken,
) -> Result<ReconcileOutcome, ReconcileError> {
    let scan = enumerate_audio_files(&request.folder, &request.extensions, request.recursive);
    let mut summary = ReconcileSummary {
        total: scan.files.len(),
        skipped_dirs: scan.skipped.len(),
        ..Default::default()
    };

    if scan.files.is_empty() {
        return Err(ReconcileError::NoFiles(request.folder.clone()));
    }
    info!(
        module = "reconcile",
        operation = "process_folder_metadata",
        "Found {} files under {:?}",
        summary.total,
        request.folder
    );
    observer.on_files_found(summary.total);

    if cancel.is_cancelled() {
        return Ok(ReconcileOutcome::Cancelled(summary));
    }

    let db_folder = folder_to_db_folder(&request.folder);
    let index = db.with_connection(|conn| {
        queries::track_path_index(conn, &db_folder).map_err(ConnectionError::from)
    })?;
    debug!(
        module = "reconcile",
        operation = "process_folder_metadata",
        "Indexed {} library tracks under {}",
        index.len(),
        db_folder
    );

    let usn = db.next_usn()?;

    let total = summary.total;
    for (i, path) in scan.files.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(
                module = "reconcile",
                operation = "process_folder_metadata",
                "Cancelled after {} of {} files",
                i,
                total
            );
            return Ok(ReconcileOutcome::Cancelled(summary));
        }

        match process_file(db, reader, path, &index, usn) {
            FileResult::Updated => summary.updated += 1,
            FileResult::NoChange => summary.no_change += 1,
            FileResult::SkippedZero => summary.skipped_zero += 1,
            FileResult::MetadataError => summary.metadata_errors += 1,
            FileResult::DbMiss => summary.db_misses += 1,
            FileResult::DbUpdateError => summary.db_update_errors += 1,
        }

        observer.on_progress((i + 1) as f64 / total as f64, summary.updated, total);
    }

    observer.on_progress(1.0, summary.updated, total);
    info!(
        module = "reconcile",
        operation = "process_folder_metadata",
        usn,
        "Metadata sync finished: {}",
        summary
    );
    Ok(ReconcileOutcome::Completed(summary))
}
