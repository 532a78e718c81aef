use serde::Serialize;

/// A row of `djmdContent`, reduced to the columns this tool reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    /// Full stored path of the audio file, forward slashes.
    pub folder_path: String,
    pub file_name: String,
    pub title: Option<String>,
    pub stock_date: Option<String>,
    pub created_date: Option<String>,
    pub color_id: Option<String>,
    pub play_count: Option<i64>,
    pub album_id: Option<String>,
}

/// A playlist or playlist folder, with its display path resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub seq: i64,
    pub is_folder: bool,
    pub display_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePoint {
    pub id: String,
    pub content_id: String,
    pub in_msec: i64,
    pub out_msec: Option<i64>,
    pub kind: i64,
    pub comment: Option<String>,
}

/// Current values of the columns the metadata sync may write for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMetadata {
    pub album_id: Option<String>,
    pub album_artist_id: Option<String>,
    pub original_artist_id: Option<String>,
    pub release_date: Option<String>,
    pub subtitle: Option<String>,
}
