//! Track and queue state for TuneFlow
//!
//! The queue is replaced wholesale (a new search, or switching to the
//! favorites list) and never edited in place. The cursor is only ever `Some`
//! while it points inside the current track list.

use serde::{Deserialize, Serialize};

/// A playable catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque content identifier understood by the embedded player
    pub id: String,

    /// Display title
    pub title: String,

    /// Uploading channel, shown as the artist
    #[serde(alias = "channel")]
    pub channel_name: String,

    /// Thumbnail image URL
    #[serde(alias = "thumbnail", default)]
    pub thumbnail_url: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        channel_name: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel_name: channel_name.into(),
            thumbnail_url: thumbnail_url.into(),
        }
    }
}

/// Ordered play queue with its cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole track list, keeping the cursor only if still in range
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        if self.cursor.is_some_and(|index| index >= self.tracks.len()) {
            self.cursor = None;
        }
    }

    /// Point the cursor at `index`; returns the track, or `None` when out of range
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.cursor = Some(index);
        self.tracks.get(index)
    }

    /// Index that follows the cursor, wrapping after the last track
    pub fn next_index(&self) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        Some(match self.cursor {
            Some(index) => (index + 1) % len,
            None => 0,
        })
    }

    /// Index that precedes the cursor, wrapping before the first track
    pub fn previous_index(&self) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        Some(match self.cursor {
            Some(index) => (index + len - 1) % len,
            None => len - 1,
        })
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|index| self.tracks.get(index))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
