//! Video metadata search
//!
//! Two-phase lookup against the video provider's REST API: a text search for
//! embeddable music-category videos, then a details request for the
//! durations (the search endpoint does not return them). Durations arrive as
//! ISO-8601 (`PT#H#M#S`); malformed values are reported as 0 and rendered
//! `--:--` downstream.

use crate::error::{Error, Result};
use mixdeck_common::human_time::parse_iso8601_duration;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const MAX_RESULTS: u32 = 20;

/// One search result, ready to be enqueued as a track.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VideoHit {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail_url: String,
    pub duration_seconds: u64,
}

pub struct SearchClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SearchClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn search(&self, query: &str) -> Result<Vec<VideoHit>> {
        if self.api_key.is_empty() {
            return Err(Error::Search("search API key not configured".to_string()));
        }

        let search: SearchResponse = self
            .get(
                &format!("{}/search", self.base_url),
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "video"),
                    // Music category, embeddable players only
                    ("videoCategoryId", "10"),
                    ("videoEmbeddable", "true"),
                    ("maxResults", &MAX_RESULTS.to_string()),
                    ("key", &self.api_key),
                ],
            )
            .await?;

        let ids: Vec<&str> = search
            .items
            .iter()
            .filter_map(|item| item.id.video_id.as_deref())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let details: DetailsResponse = self
            .get(
                &format!("{}/videos", self.base_url),
                &[
                    ("part", "contentDetails,snippet"),
                    ("id", &ids.join(",")),
                    ("key", &self.api_key),
                ],
            )
            .await?;

        debug!(query, hits = details.items.len(), "video search completed");
        Ok(details.items.into_iter().map(VideoHit::from).collect())
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Search(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Search(format!(
                "provider returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Search(format!("malformed response: {e}")))
    }
}

// ---- wire types --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    items: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
struct DetailsItem {
    id: String,
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

impl From<DetailsItem> for VideoHit {
    fn from(item: DetailsItem) -> Self {
        // Preference order matches what the views expect: medium first,
        // then default, then high.
        let thumbnail_url = item
            .snippet
            .thumbnails
            .medium
            .or(item.snippet.thumbnails.default)
            .or(item.snippet.thumbnails.high)
            .map(|t| t.url)
            .unwrap_or_default();
        Self {
            id: item.id,
            title: item.snippet.title,
            channel: item.snippet.channel_title,
            thumbnail_url,
            duration_seconds: parse_iso8601_duration(&item.content_details.duration),
        }
    }
}
