use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{format_duration, format_relative_str};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, thiserror::Error)]
pub enum YoutubeError {
    #[error("YouTube API returned HTTP {status}")]
    Upstream { status: u16, details: Value },
    #[error("YouTube request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid YouTube API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no channel found for handle '{0}'")]
    ChannelNotFound(String),
}

/// Video as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub channel_title: String,
    /// `M:SS` or `H:MM:SS`
    pub duration: String,
    /// Portuguese relative label ("Há 3 dias")
    pub published_at: String,
    pub published_at_raw: String,
    pub view_count: u64,
}

// ---------------------------------------------------------------------------
// Upstream payloads (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVideo {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: VideoDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    description: String,
    published_at: String,
    channel_title: String,
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoDetails {
    duration: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    /// The API sends counts as strings
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: ChannelDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

const THUMBNAIL_PREFERENCE: [&str; 4] = ["maxres", "high", "medium", "default"];

impl Video {
    fn from_raw(raw: RawVideo, now: DateTime<Utc>) -> Self {
        let RawVideo {
            id,
            snippet,
            content_details,
            statistics,
        } = raw;
        let thumbnail = THUMBNAIL_PREFERENCE
            .iter()
            .find_map(|k| snippet.thumbnails.get(*k))
            .map(|t| t.url.clone())
            .unwrap_or_default();
        Self {
            id,
            thumbnail,
            duration: format_duration(&content_details.duration),
            published_at: format_relative_str(&snippet.published_at, now),
            published_at_raw: snippet.published_at,
            title: snippet.title,
            description: snippet.description,
            channel_title: snippet.channel_title,
            view_count: statistics
                .view_count
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, YoutubeError> {
        let base = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let url = url::Url::parse_with_params(
            &base,
            params.iter().copied().chain([("key", self.api_key.as_str())]),
        )?;

        tracing::debug!(endpoint, "YouTube API request");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str(&body).unwrap_or(Value::String(body));
            tracing::warn!(endpoint, status = status.as_u16(), "YouTube API error");
            return Err(YoutubeError::Upstream {
                status: status.as_u16(),
                details,
            });
        }
        Ok(response.json().await?)
    }

    /// Details for the given video ids, in the order the API returns them.
    pub async fn videos(&self, ids: &[String]) -> Result<Vec<Video>, YoutubeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.join(",");
        let list: ListResponse<RawVideo> = self
            .get(
                "videos",
                &[("part", "snippet,contentDetails,statistics"), ("id", &ids)],
            )
            .await?;
        let now = Utc::now();
        Ok(list.items.into_iter().map(|v| Video::from_raw(v, now)).collect())
    }

    /// Latest uploads of a channel, newest first.
    pub async fn channel_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<Video>, YoutubeError> {
        let max = max_results.to_string();
        let search: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "id"),
                    ("channelId", channel_id),
                    ("maxResults", &max),
                    ("order", "date"),
                    ("type", "video"),
                ],
            )
            .await?;
        let ids: Vec<String> = search.items.into_iter().filter_map(|i| i.id.video_id).collect();
        self.videos(&ids).await
    }

    /// Latest uploads of the channel behind an `@handle`.
    pub async fn handle_videos(&self, handle: &str, max_results: u32) -> Result<Vec<Video>, YoutubeError> {
        let channels: ListResponse<ChannelItem> = self
            .get("channels", &[("part", "contentDetails"), ("forHandle", handle)])
            .await?;
        let uploads = channels
            .items
            .into_iter()
            .next()
            .and_then(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| YoutubeError::ChannelNotFound(handle.to_string()))?;

        let max = max_results.to_string();
        let playlist: ListResponse<PlaylistItem> = self
            .get(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", &uploads),
                    ("maxResults", &max),
                ],
            )
            .await?;
        let ids: Vec<String> = playlist
            .items
            .into_iter()
            .map(|i| i.content_details.video_id)
            .collect();
        self.videos(&ids).await
    }
}
