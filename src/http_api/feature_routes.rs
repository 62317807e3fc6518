//! HTTP endpoints for the feature hooks.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::bridge_routes::bridge_error_status;
use super::types::*;
use crate::AppState;
use crate::features::{CATALOG, FeatureError, FeatureKind};

fn feature_error(err: FeatureError) -> ApiError {
    let status = match &err {
        FeatureError::UnknownFeature(_) | FeatureError::UnknownAction { .. } => StatusCode::NOT_FOUND,
        FeatureError::Bridge(e) => bridge_error_status(e),
    };
    api_error(status, err.to_string())
}

fn parse_kind(slug: &str) -> Result<FeatureKind, ApiError> {
    slug.parse().map_err(feature_error)
}

/// Empty body means no arguments.
fn parse_args(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("arguments must be a JSON object: {e}")))
}

/// GET /api/features
pub(super) async fn list_features(State(state): State<Arc<AppState>>) -> Json<Vec<FeatureSummary>> {
    Json(
        CATALOG
            .iter()
            .map(|descriptor| FeatureSummary {
                descriptor,
                mounted: state.is_mounted(descriptor.kind),
            })
            .collect(),
    )
}

/// GET /api/features/{slug}: mounts the hook on first access.
pub(super) async fn get_feature(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&slug)?;
    let hook = state.feature(kind);
    Ok(Json(json!({
        "feature": kind,
        "policy": hook.descriptor().policy,
        "defaults": hook.defaults(),
    })))
}

/// POST /api/features/{slug}/actions/{action}[?wait=true]
pub(super) async fn run_action(
    State(state): State<Arc<AppState>>,
    Path((slug, action)): Path<(String, String)>,
    Query(q): Query<ActionQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&slug)?;
    let args = parse_args(&body)?;
    let hook = state.feature(kind);

    if q.wait {
        let response = hook.start_and_wait(&action, args).await.map_err(feature_error)?;
        return Ok(Json(response).into_response());
    }
    hook.start(&action, args).map_err(feature_error)?;
    Ok((StatusCode::ACCEPTED, Json(json!({"ok": true}))).into_response())
}

/// DELETE /api/features/{slug}
pub(super) async fn unmount_feature(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&slug)?;
    if state.unmount_feature(kind) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("feature '{kind}' is not mounted")))
    }
}
