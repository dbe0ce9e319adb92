//! YouTube Data API search

use crate::library::Catalog;
use crate::player::Track;
use crate::utils::config::CatalogConfig;
use crate::utils::error::{IntoTuneFlowError, Result, TuneFlowError};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Decode a search response body into tracks.
///
/// Items without a video id (channels, playlists) are skipped. The medium
/// thumbnail is preferred over the default one.
pub fn parse_search_response(body: &str) -> Result<Vec<Track>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Err(TuneFlowError::Catalog(format!(
            "Search failed ({}): {}",
            error.code, error.message
        )));
    }

    let tracks = response
        .items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id?;
            let thumbnails = item.snippet.thumbnails;
            let thumbnail = thumbnails
                .medium
                .or(thumbnails.default)
                .map(|t| t.url)
                .unwrap_or_default();
            Some(Track::new(id, item.snippet.title, item.snippet.channel_title, thumbnail))
        })
        .collect();

    Ok(tracks)
}

/// Catalog backed by the YouTube Data API v3
pub struct YouTubeCatalog {
    http: Client,
    config: CatalogConfig,
}

impl YouTubeCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("tuneflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .catalog_err("Failed to create HTTP client")?;

        Ok(Self { http, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                TuneFlowError::Config(
                    "No YouTube API key configured (set catalog.api_key or TUNEFLOW_API_KEY)"
                        .to_string(),
                )
            })
    }
}

#[async_trait(?Send)]
impl Catalog for YouTubeCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = self.api_key()?;
        let q = format!("{}{}", query, self.config.query_suffix);
        let max_results = self.config.max_results.to_string();

        debug!("Searching catalog for \"{}\"", q);

        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("part", "snippet"),
                ("q", q.as_str()),
                ("type", "video"),
                ("videoCategoryId", self.config.category_id.as_str()),
                ("maxResults", max_results.as_str()),
                ("key", key),
                ("safeSearch", "none"),
            ])
            .send()
            .await?;

        // Error bodies carry the API's own message, so parse them too
        let body = response.text().await?;
        let tracks = parse_search_response(&body)?;

        info!("Catalog returned {} tracks for \"{}\"", tracks.len(), query);
        Ok(tracks)
    }
}
