mod bridge_routes;
mod feature_routes;
mod host_events;
mod toast_routes;
mod types;
mod youtube_routes;

use crate::AppState;
use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use types::HealthResponse;

/// Browser origins allowed to call the API: the dashboard is served from
/// the local machine, on any port.
fn is_local_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let host = rest.split(':').next().unwrap_or_default();
    matches!(host, "localhost" | "127.0.0.1")
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| is_local_origin(origin)))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        // Bridge
        .route("/api/bridge/status", get(bridge_routes::bridge_status))
        .route("/api/bridge/invoke", post(bridge_routes::invoke))
        .route("/api/bridge/request", post(bridge_routes::request))
        .route("/api/bridge/host/events", get(host_events::host_events))
        .route("/api/bridge/callbacks/{name}", post(bridge_routes::deliver_callback))
        // Features
        .route("/api/features", get(feature_routes::list_features))
        .route(
            "/api/features/{slug}",
            get(feature_routes::get_feature).delete(feature_routes::unmount_feature),
        )
        .route("/api/features/{slug}/actions/{action}", post(feature_routes::run_action))
        // Toasts
        .route(
            "/api/toasts",
            get(toast_routes::get_toasts).delete(toast_routes::clear_toasts),
        )
        // Video proxy
        .route("/api/youtube", get(youtube_routes::videos_by_id))
        .route("/api/youtube/channel", get(youtube_routes::channel_videos))
        .route("/api/youtube/handle", get(youtube_routes::handle_videos))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind the configured address and serve until the shutdown sender in
/// [`AppState`] fires.
pub async fn start_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind_addr = {
        let config = state.config.read();
        format!("{}:{}", config.bind_address, config.port)
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let addr = listener.local_addr().context("failed to get local address")?;
    tracing::info!(%addr, "dashboard API listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    *state.server_shutdown.lock() = Some(shutdown_tx);

    let app = build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        })
        .await
        .context("HTTP server error")?;

    state.channel.detach();
    tracing::info!("dashboard API stopped");
    Ok(())
}

/// Ask a running server to stop. Returns false if none was running.
pub fn request_shutdown(state: &AppState) -> bool {
    match state.server_shutdown.lock().take() {
        Some(tx) => tx.send(()).is_ok(),
        None => false,
    }
}
