use super::{ReportError, ReportRequest, TrackSource};
use crate::library_db::paths::folder_to_db_folder;
use crate::library_db::{queries, ConnectionManager, CuePoint, Track};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ReportTrack {
    #[serde(flatten)]
    pub track: Track,
    pub cues: Vec<CuePoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracksReport {
    pub generated_at: String,
    /// Folder path or playlist display path the tracks were taken from.
    pub source: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub track_count: usize,
    pub tracks: Vec<ReportTrack>,
}

/// Collects the requested tracks with their cue points. Never writes to the library.
pub fn build_tracks_report(
    db: &ConnectionManager,
    request: &ReportRequest,
) -> Result<TracksReport, ReportError> {
    let (source, tracks) = db.with_connection(|conn| -> Result<_, ReportError> {
        let (source, candidates) = match &request.source {
            TrackSource::Folder(folder) => {
                let prefix = folder_to_db_folder(folder);
                let tracks = queries::tracks_in_folder(conn, &prefix)?;
                (prefix, tracks)
            }
            TrackSource::Playlist(id) => {
                let playlist = queries::playlists(conn)?
                    .into_iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| ReportError::PlaylistNotFound(id.clone()))?;
                (playlist.display_path, queries::tracks_in_playlist(conn, id)?)
            }
        };

        let mut tracks = Vec::new();
        for track in candidates {
            if !request.includes_stock_date(track.stock_date.as_deref()) {
                continue;
            }
            let cues = queries::cues_for_track(conn, &track.id)?;
            tracks.push(ReportTrack { track, cues });
        }
        Ok((source, tracks))
    })?;

    info!(
        module = "report",
        operation = "build",
        "Collected {} tracks from {}",
        tracks.len(),
        source
    );

    Ok(TracksReport {
        generated_at: Local::now().to_rfc3339(),
        source,
        date_from: request.date_from.map(|d| d.to_string()),
        date_to: request.date_to.map(|d| d.to_string()),
        track_count: tracks.len(),
        tracks,
    })
}

pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("tracks-report-{}.json", at.format("%Y%m%d-%H%M%S"))
}

/// Writes `report` as pretty JSON into `output_folder` and returns the file path.
pub fn write_report(report: &TracksReport, output_folder: &Path) -> Result<PathBuf, ReportError> {
    let path = output_folder.join(report_file_name(&Local::now()));
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, content).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    info!(
        module = "report",
        operation = "write",
        "Wrote {} tracks to {:?}",
        report.track_count,
        path
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(report_file_name(&at), "tracks-report-20240309-070501.json");
    }

    #[test]
    fn test_report_serializes_flat_tracks() {
        let report = TracksReport {
            generated_at: "now".into(),
            source: "/music/".into(),
            date_from: None,
            date_to: None,
            track_count: 1,
            tracks: vec![ReportTrack {
                track: Track {
                    id: "1".into(),
                    folder_path: "/music/a.flac".into(),
                    file_name: "a.flac".into(),
                    title: None,
                    stock_date: None,
                    created_date: None,
                    color_id: None,
                    play_count: Some(3),
                    album_id: None,
                },
                cues: vec![],
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["trackCount"], 1);
        assert_eq!(value["tracks"][0]["folderPath"], "/music/a.flac");
        assert!(value["tracks"][0].get("folder_path").is_none());
        assert_eq!(value["tracks"][0]["playCount"], 3);
        assert_eq!(value["tracks"][0]["cues"], serde_json::json!([]));
    }
}
