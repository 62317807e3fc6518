use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::features::FeatureDescriptor;

/// Error shape every route returns: status plus `{"error": ...}`.
pub(super) type ApiError = (StatusCode, Json<Value>);

pub(super) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({"error": message.into()})))
}

// --- Request/Response types ---

#[derive(Serialize)]
pub(super) struct HealthResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub(super) struct BridgeStatus {
    pub available: bool,
    pub busy: bool,
    pub in_flight: usize,
    pub pending: usize,
    pub scheme: String,
    pub callbacks: Vec<String>,
}

#[derive(Deserialize)]
pub(super) struct InvokeRequest {
    pub method: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Deserialize)]
pub(super) struct HostEventsQuery {
    /// Comma-separated methods the host exposes as direct entry points
    #[serde(default)]
    pub methods: Option<String>,
}

#[derive(Serialize)]
pub(super) struct FeatureSummary {
    #[serde(flatten)]
    pub descriptor: &'static FeatureDescriptor,
    pub mounted: bool,
}

#[derive(Deserialize)]
pub(super) struct ActionQuery {
    #[serde(default)]
    pub wait: bool,
}

#[derive(Deserialize)]
pub(super) struct ToastQuery {
    #[serde(default)]
    pub limit: usize,
    /// Optional kind filter: "success", "error", "info"
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VideoIdsQuery {
    pub ids: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChannelQuery {
    pub channel_id: Option<String>,
    pub max_results: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct HandleQuery {
    pub handle: Option<String>,
    #[serde(rename = "maxResults")]
    pub max_results: Option<String>,
}
