//! Bridge channel between the dashboard and the CAD host.
//!
//! Outbound, [`BridgeChannel::invoke`] fires a method at the host and reports
//! problems as toasts; the caller never sees an error. Responses come back
//! out-of-band through [`BridgeChannel::deliver`], which routes them to the
//! handler registered under the callback name.
//!
//! [`BridgeChannel::request`] is the correlated variant: it tags the call with a
//! request id and resolves when a delivery echoes that id, whichever callback
//! name the host used.

pub mod transport;
pub mod types;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::notify::Notifier;
use crate::registry::{CallbackRegistry, DispatchOutcome, HandlerSpec, Registration, notify_outcome};

pub use transport::{HostObject, UriNavigationTransport, select_transport};
pub use types::{BridgeError, BridgeMethodCall, BridgeResponse, HostError, REQUEST_ID_FIELD};

/// Generic acknowledgement slot the host uses when a feature has no slot of its own.
pub const DEFAULT_ACK_CALLBACK: &str = "handleBridgeResponse";

pub const HOST_UNAVAILABLE_MESSAGE: &str =
    "SketchUp não está disponível. Abra o painel pelo plugin para usar esta função.";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub uri_scheme: String,
    pub request_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            uri_scheme: transport::DEFAULT_URI_SCHEME.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Counts an invocation attempt as in flight until dropped.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Removes a pending request id when the requester stops waiting.
struct PendingGuard<'a> {
    pending: &'a DashMap<String, oneshot::Sender<BridgeResponse>>,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

pub struct BridgeChannel {
    host: RwLock<Option<Arc<dyn HostObject>>>,
    navigation: UriNavigationTransport,
    registry: Arc<CallbackRegistry>,
    notifier: Arc<dyn Notifier>,
    in_flight: AtomicUsize,
    pending: DashMap<String, oneshot::Sender<BridgeResponse>>,
    request_timeout: Duration,
    _ack: Registration,
}

impl BridgeChannel {
    pub fn new(registry: Arc<CallbackRegistry>, options: ChannelOptions) -> Arc<Self> {
        let ack = registry.register([(DEFAULT_ACK_CALLBACK, HandlerSpec::Toast)]);
        Arc::new(Self {
            host: RwLock::new(None),
            navigation: UriNavigationTransport::new(options.uri_scheme),
            notifier: registry.notifier().clone(),
            registry,
            in_flight: AtomicUsize::new(0),
            pending: DashMap::new(),
            request_timeout: options.request_timeout,
            _ack: ack,
        })
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn scheme(&self) -> &str {
        self.navigation.scheme()
    }

    /// Capture the host object. Replaces any previously attached host; requests
    /// pending on the old one fail with `Detached`.
    pub fn attach(&self, host: Arc<dyn HostObject>) {
        let mut current = self.host.write();
        if current.replace(host).is_some() {
            tracing::info!(pending = self.pending.len(), "replaced attached SketchUp host");
            self.pending.clear();
        } else {
            tracing::info!("SketchUp host attached");
        }
    }

    /// Release the host. Pending correlated requests fail with `Detached`.
    pub fn detach(&self) {
        let mut current = self.host.write();
        if current.take().is_some() {
            tracing::info!(pending = self.pending.len(), "SketchUp host detached");
        }
        // Dropping the senders wakes every waiter with a closed channel.
        // Cleared under the host lock so no request registers in between.
        self.pending.clear();
    }

    /// Detach only if `host` is still the attached one.
    pub fn detach_if_current(&self, host: &Arc<dyn HostObject>) -> bool {
        let is_current = self
            .host
            .read()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, host));
        if is_current {
            self.detach();
        }
        is_current
    }

    fn available_host(&self) -> Option<Arc<dyn HostObject>> {
        self.host.read().clone().filter(|h| h.is_present())
    }

    /// Host environment present and captured.
    pub fn is_available(&self) -> bool {
        self.available_host().is_some()
    }

    /// True while at least one invocation attempt is inside its send section.
    /// Does not track host responses.
    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Fire `method` at the host. Failures become an error toast, never an error.
    pub fn invoke(&self, method: &str, args: Map<String, Value>) {
        let Some(host) = self.available_host() else {
            self.report_unavailable(method);
            return;
        };
        let call = BridgeMethodCall::new(method, args);
        if let Err(e) = self.send(host.as_ref(), &call) {
            self.report_failure(method, &e);
        }
    }

    /// Fire `method` and wait for the response carrying the same request id.
    pub async fn request(
        &self,
        method: &str,
        mut args: Map<String, Value>,
    ) -> Result<BridgeResponse, BridgeError> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        // Register while holding the host lock: a concurrent attach or detach
        // either happens first (no host) or clears this entry afterwards.
        let host = {
            let current = self.host.read();
            match current.as_ref().filter(|h| h.is_present()) {
                Some(host) => {
                    self.pending.insert(request_id.clone(), tx);
                    Some(Arc::clone(host))
                }
                None => None,
            }
        };
        let Some(host) = host else {
            self.report_unavailable(method);
            return Err(BridgeError::Unavailable);
        };
        args.insert(REQUEST_ID_FIELD.to_string(), Value::String(request_id.clone()));

        let _pending = PendingGuard {
            pending: &self.pending,
            id: request_id,
        };

        let call = BridgeMethodCall::new(method, args);
        if let Err(e) = self.send(host.as_ref(), &call) {
            self.report_failure(method, &e);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                let err = BridgeError::Detached;
                self.report_failure(method, &err);
                return Err(err);
            }
            Err(_) => {
                let err = BridgeError::Timeout {
                    method: method.to_string(),
                    after: self.request_timeout,
                };
                self.report_failure(method, &err);
                return Err(err);
            }
        };

        notify_outcome(self.notifier.as_ref(), response.success, &response.message);
        Ok(response)
    }

    /// Entry point for the host calling back into `callback`.
    pub fn deliver(&self, callback: &str, payload: Value) -> DispatchOutcome {
        if let Some(id) = payload.get(REQUEST_ID_FIELD).and_then(Value::as_str)
            && let Some((_, tx)) = self.pending.remove(id)
        {
            tracing::debug!(callback, request_id = id, "correlated host response");
            if tx.send(BridgeResponse::from_value(payload)).is_err() {
                tracing::debug!(callback, "requester stopped waiting before the response arrived");
            }
            return DispatchOutcome::Correlated;
        }
        self.registry.dispatch(callback, &payload)
    }

    fn send(&self, host: &dyn HostObject, call: &BridgeMethodCall) -> Result<(), BridgeError> {
        let _busy = BusyGuard::enter(&self.in_flight);
        let payload = call.payload()?;
        let transport = select_transport(host, &call.method, &self.navigation);
        tracing::debug!(method = %call.method, transport = transport.name(), "invoking host method");
        transport.send(host, &call.method, &payload)
    }

    fn report_unavailable(&self, method: &str) {
        tracing::warn!(method, "SketchUp host unavailable, invocation skipped");
        self.notifier.error(HOST_UNAVAILABLE_MESSAGE);
    }

    fn report_failure(&self, method: &str, err: &BridgeError) {
        tracing::error!(method, error = %err, "host invocation failed");
        self.notifier.error(&format!("Falha ao executar \"{method}\": {err}"));
    }
}
