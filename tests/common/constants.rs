//! Shared constants for end-to-end tests

#![allow(dead_code)]

/// USN stored in the registry of a fresh test library.
pub const INITIAL_USN: i64 = 100;

// ============================================================================
// Library rows created by `TestLibrary::with_tracks`
// ============================================================================

pub const ALBUM_1_ID: &str = "5001";
pub const ALBUM_1_NAME: &str = "Night Drives";

/// Artist already present in the library.
pub const ARTIST_1_ID: &str = "7001";
pub const ARTIST_1_NAME: &str = "Nova Reel";

/// Track with an album, file `A/one.flac`.
pub const TRACK_1_ID: &str = "9001";
/// Track without an album, file `A/two.flac`.
pub const TRACK_2_ID: &str = "9002";
/// Track with an album, file `A/sub/three.flac`.
pub const TRACK_3_ID: &str = "9003";

pub const TRACK_1_FILE: &str = "A/one.flac";
pub const TRACK_2_FILE: &str = "A/two.flac";
pub const TRACK_3_FILE: &str = "A/sub/three.flac";

pub const PLAYLIST_FOLDER_ID: &str = "300";
pub const PLAYLIST_1_ID: &str = "301";
