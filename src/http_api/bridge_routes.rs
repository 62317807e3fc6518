//! HTTP endpoints for the bridge channel.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

use super::types::*;
use crate::AppState;
use crate::bridge::{BridgeError, BridgeResponse};

/// Status code a failed correlated request maps to.
pub(super) fn bridge_error_status(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        BridgeError::Serialize(_) => StatusCode::BAD_REQUEST,
        BridgeError::Host(_) | BridgeError::Detached => StatusCode::BAD_GATEWAY,
    }
}

/// GET /api/bridge/status
pub(super) async fn bridge_status(State(state): State<Arc<AppState>>) -> Json<BridgeStatus> {
    let channel = &state.channel;
    Json(BridgeStatus {
        available: channel.is_available(),
        busy: channel.is_busy(),
        in_flight: channel.in_flight(),
        pending: channel.pending_requests(),
        scheme: channel.scheme().to_string(),
        callbacks: channel.registry().names(),
    })
}

/// POST /api/bridge/invoke: fire and notify, the outcome shows up as a toast.
pub(super) async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InvokeRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.method.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "method is required"));
    }
    state.channel.invoke(&body.method, body.args);
    Ok((StatusCode::ACCEPTED, Json(json!({"ok": true}))))
}

/// POST /api/bridge/request: invoke and wait for the correlated response.
pub(super) async fn request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InvokeRequest>,
) -> Result<Json<BridgeResponse>, ApiError> {
    if body.method.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "method is required"));
    }
    state
        .channel
        .request(&body.method, body.args)
        .await
        .map(Json)
        .map_err(|e| api_error(bridge_error_status(&e), e.to_string()))
}

/// POST /api/bridge/callbacks/{name}: the host delivering a response.
pub(super) async fn deliver_callback(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let outcome = state.channel.deliver(&name, payload);
    Json(json!({"outcome": outcome}))
}
