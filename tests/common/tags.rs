//! In-memory tag source for pipeline tests

#![allow(dead_code)]

use crate_sync::reconcile::{TagError, TagMap, TagReader};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub fn tag_map(entries: &[(&str, &str)]) -> TagMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Returns preset tags per path. Unknown paths have no tags.
#[derive(Default)]
pub struct FakeTagReader {
    tags: HashMap<PathBuf, TagMap>,
    failing: HashSet<PathBuf>,
}

impl FakeTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, path: impl Into<PathBuf>, entries: &[(&str, &str)]) -> Self {
        self.tags.insert(path.into(), tag_map(entries));
        self
    }

    /// Reading `path` fails as if the file had no tag block.
    pub fn failing(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.insert(path.into());
        self
    }
}

impl TagReader for FakeTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap, TagError> {
        if self.failing.contains(path) {
            return Err(TagError::NoTags);
        }
        Ok(self.tags.get(path).cloned().unwrap_or_default())
    }
}
