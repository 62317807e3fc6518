//! Video proxy endpoints. The API key never leaves the server.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

use super::types::*;
use crate::AppState;
use crate::youtube::{Video, YoutubeClient, YoutubeError};

const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_LIMIT: u32 = 50;

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("{name} is required")))
}

fn max_results(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT)
}

fn client(state: &AppState) -> Result<YoutubeClient, ApiError> {
    state.youtube_client().ok_or_else(|| {
        tracing::error!("YouTube API key not configured");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "YouTube API key not configured")
    })
}

fn upstream_error(err: YoutubeError) -> ApiError {
    match err {
        YoutubeError::Upstream { status, details } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({"error": "YouTube API request failed", "details": details})),
        ),
        YoutubeError::ChannelNotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
        YoutubeError::Transport(_) | YoutubeError::Url(_) => {
            tracing::warn!("YouTube proxy failure: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "YouTube API unreachable", "details": err.to_string()})),
            )
        }
    }
}

fn videos_json(videos: Vec<Video>) -> Json<Value> {
    Json(json!({"videos": videos}))
}

/// GET /api/youtube?ids=a,b,c
pub(super) async fn videos_by_id(
    State(state): State<Arc<AppState>>,
    Query(q): Query<VideoIdsQuery>,
) -> Result<Json<Value>, ApiError> {
    let ids = required(q.ids, "ids")?;
    let client = client(&state)?;
    let ids: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    client.videos(&ids).await.map(videos_json).map_err(upstream_error)
}

/// GET /api/youtube/channel?channelId=..&maxResults=..
pub(super) async fn channel_videos(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChannelQuery>,
) -> Result<Json<Value>, ApiError> {
    let channel_id = required(q.channel_id, "channelId")?;
    let client = client(&state)?;
    client
        .channel_videos(&channel_id, max_results(q.max_results.as_deref()))
        .await
        .map(videos_json)
        .map_err(upstream_error)
}

/// GET /api/youtube/handle?handle=@name
pub(super) async fn handle_videos(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HandleQuery>,
) -> Result<Json<Value>, ApiError> {
    let handle = required(q.handle, "handle")?;
    let client = client(&state)?;
    client
        .handle_videos(&handle, max_results(q.max_results.as_deref()))
        .await
        .map(videos_json)
        .map_err(upstream_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_results_defaults_and_clamps() {
        assert_eq!(max_results(None), 10);
        assert_eq!(max_results(Some("abc")), 10);
        assert_eq!(max_results(Some("0")), 1);
        assert_eq!(max_results(Some("25")), 25);
        assert_eq!(max_results(Some("500")), 50);
    }

    #[test]
    fn blank_param_is_missing() {
        assert!(required(Some("  ".into()), "ids").is_err());
        assert!(required(None, "ids").is_err());
        assert_eq!(required(Some(" x ".into()), "ids").unwrap(), "x");
    }
}
