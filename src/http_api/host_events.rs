//! Event stream the CAD host attaches through.
//!
//! SketchUp's side of the plugin opens `GET /api/bridge/host/events` and
//! keeps it open. Outbound invocations are pushed down the stream as `call`
//! or `navigate` events; responses come back through
//! `POST /api/bridge/callbacks/{name}`.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde::Serialize;
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::types::HostEventsQuery;
use crate::AppState;
use crate::bridge::{BridgeChannel, HostError, HostObject};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum HostEvent {
    Call { method: String, payload: String },
    Navigate { uri: String },
}

impl HostEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Navigate { .. } => "navigate",
        }
    }
}

/// Host object backed by one event-stream connection.
pub(super) struct StreamHost {
    session_id: String,
    methods: HashSet<String>,
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl StreamHost {
    fn push(&self, event: HostEvent) -> Result<(), HostError> {
        self.tx.send(event).map_err(|_| {
            tracing::debug!(session_id = %self.session_id, "host stream closed, event dropped");
            HostError::Closed
        })
    }
}

impl HostObject for StreamHost {
    fn is_present(&self) -> bool {
        !self.tx.is_closed()
    }

    fn has_callable(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    fn call(&self, method: &str, payload: &str) -> Result<(), HostError> {
        self.push(HostEvent::Call {
            method: method.to_string(),
            payload: payload.to_string(),
        })
    }

    fn navigate(&self, uri: &str) -> Result<(), HostError> {
        self.push(HostEvent::Navigate { uri: uri.to_string() })
    }
}

/// Detaches the stream's host when the connection goes away, unless another
/// host has been attached since.
struct DetachOnDrop {
    channel: Arc<BridgeChannel>,
    host: Weak<dyn HostObject>,
    session_id: String,
}

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        if self.channel.detach_if_current(&host) {
            tracing::info!(session_id = %self.session_id, "host event stream closed");
        }
    }
}

fn parse_methods(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET /api/bridge/host/events?methods=a,b
pub(super) async fn host_events(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HostEventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel::<HostEvent>();
    let methods = parse_methods(q.methods.as_deref());
    tracing::debug!(session_id = %session_id, direct_methods = methods.len(), "host connecting");

    let host: Arc<dyn HostObject> = Arc::new(StreamHost {
        session_id: session_id.clone(),
        methods,
        tx,
    });
    state.attach_host(host.clone());

    let guard = DetachOnDrop {
        channel: state.channel.clone(),
        host: Arc::downgrade(&host),
        session_id: session_id.clone(),
    };
    // The channel owns the host from here on; once it lets go the sender
    // drops and the stream ends.
    drop(host);

    let stream = async_stream::stream! {
        let _guard = guard;
        let hello = serde_json::json!({"session_id": session_id});
        yield Ok(Event::default().event("attached").data(hello.to_string()));

        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event.name()).data(data));
        }
        tracing::debug!(session_id = %session_id, "host replaced, closing stream");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
