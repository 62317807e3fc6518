//! HTTP endpoints for the toast ring buffer.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use std::sync::Arc;

use super::types::*;
use crate::AppState;
use crate::notify::{Toast, ToastKind};

/// GET /api/toasts: most recent toasts, oldest first.
pub(super) async fn get_toasts(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ToastQuery>,
) -> Result<Json<Vec<Toast>>, ApiError> {
    let kind = match q.kind.as_deref() {
        None => None,
        Some(k) => Some(
            ToastKind::parse(k)
                .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown toast kind '{k}'")))?,
        ),
    };

    let mut entries = state.toasts.entries(q.limit);
    if let Some(kind) = kind {
        entries.retain(|t| t.kind == kind);
    }
    Ok(Json(entries))
}

/// DELETE /api/toasts
pub(super) async fn clear_toasts(State(state): State<Arc<AppState>>) -> StatusCode {
    state.toasts.clear();
    StatusCode::NO_CONTENT
}
