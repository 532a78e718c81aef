//! Reading embedded tags into a flat key/value map.

use lofty::error::LoftyError;
use lofty::prelude::{ItemKey, TaggedFileExt};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tag values keyed by upper-case tag name (`ALBUMARTIST`, `SUBTITLE`, ...).
pub type TagMap = HashMap<String, String>;

pub const ALBUM_ARTIST: &str = "ALBUMARTIST";
pub const ORIGINAL_ARTIST: &str = "ORIGINALARTIST";
pub const RELEASE_DATE: &str = "RELEASEDATE";
pub const SUBTITLE: &str = "SUBTITLE";

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Unreadable tags: {0}")]
    Lofty(#[from] LoftyError),

    #[error("No tags in file")]
    NoTags,
}

/// Source of embedded tags for a single audio file.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagMap, TagError>;
}

/// Returns the trimmed value for `key`, treating blank values as absent.
pub fn tag_value<'a>(tags: &'a TagMap, key: &str) -> Option<&'a str> {
    tags.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Reads tags with `lofty`, from the primary tag or the first tag found.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

fn lofty_keys() -> [(ItemKey, &'static str); 6] {
    [
        (ItemKey::AlbumArtist, ALBUM_ARTIST),
        (ItemKey::OriginalArtist, ORIGINAL_ARTIST),
        (ItemKey::TrackSubtitle, SUBTITLE),
        (ItemKey::TrackTitle, "TITLE"),
        (ItemKey::TrackArtist, "ARTIST"),
        (ItemKey::AlbumTitle, "ALBUM"),
    ]
}

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap, TagError> {
        let tagged_file = lofty::read_from_path(path)?;
        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .ok_or(TagError::NoTags)?;

        let mut tags = TagMap::new();
        for (item_key, name) in lofty_keys() {
            if let Some(value) = tag.get_string(&item_key) {
                tags.insert(name.to_string(), value.to_string());
            }
        }

        // Formats disagree on where the release date lives.
        let release_date = tag
            .get_string(&ItemKey::ReleaseDate)
            .or_else(|| tag.get_string(&ItemKey::OriginalReleaseDate))
            .or_else(|| tag.get_string(&ItemKey::RecordingDate))
            .or_else(|| tag.get_string(&ItemKey::Year));
        if let Some(value) = release_date {
            tags.insert(RELEASE_DATE.to_string(), value.to_string());
        }

        Ok(tags)
    }
}
