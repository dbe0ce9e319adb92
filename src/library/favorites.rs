//! Favorites persisted as a JSON array

use crate::library::FavoritesStore;
use crate::player::Track;
use crate::utils::error::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Favorites kept in a JSON file, newest first
pub struct JsonFavoritesStore {
    path: PathBuf,
    tracks: Vec<Track>,
}

impl JsonFavoritesStore {
    /// Open the store at `path`.
    ///
    /// A missing or unreadable file yields an empty store; it is rewritten on
    /// the first change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tracks = match Self::load(&path) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Ignoring unreadable favorites file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        debug!("Loaded {} favorites from {}", tracks.len(), path.display());
        Self { path, tracks }
    }

    fn load(path: &Path) -> Result<Vec<Track>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, tracks: &[Track]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(tracks)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStore for JsonFavoritesStore {
    fn is_favorite(&self, id: &str) -> bool {
        self.tracks.iter().any(|track| track.id == id)
    }

    /// The in-memory list only changes once the file has been written
    fn toggle(&mut self, track: &Track) -> Result<bool> {
        let mut tracks = self.tracks.clone();
        let now_favorite = match tracks.iter().position(|t| t.id == track.id) {
            Some(index) => {
                tracks.remove(index);
                false
            }
            None => {
                tracks.insert(0, track.clone());
                true
            }
        };

        self.save(&tracks)?;
        self.tracks = tracks;
        Ok(now_favorite)
    }

    fn list(&self) -> &[Track] {
        &self.tracks
    }
}
