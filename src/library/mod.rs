//! Track sources for TuneFlow
//!
//! The playback core only ever sees [`Track`]s. This module produces them:
//! a search [`Catalog`] fills the queue, a [`FavoritesStore`] remembers the
//! tracks the user hearted.

mod favorites;
mod youtube;

pub use favorites::JsonFavoritesStore;
pub use youtube::{parse_search_response, YouTubeCatalog};

use crate::player::Track;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Searchable track catalog
#[async_trait(?Send)]
pub trait Catalog {
    /// Search for tracks matching `query`.
    ///
    /// A blank query returns an empty list without contacting the catalog.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;
}

/// Persistent set of favorite tracks
pub trait FavoritesStore {
    fn is_favorite(&self, id: &str) -> bool;

    /// Add the track if absent, remove it otherwise.
    ///
    /// Returns whether the track is a favorite afterwards.
    fn toggle(&mut self, track: &Track) -> Result<bool>;

    /// All favorites, most recently added first
    fn list(&self) -> &[Track];
}
