//! Host invocation conventions.
//!
//! A host either exposes a directly callable entry point per method, or
//! intercepts navigation to a custom-scheme URI. The transport is chosen per
//! call by probing the host for the method.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::types::{BridgeError, HostError};

/// Characters `encodeURIComponent` escapes: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_URI_SCHEME: &str = "skp";

pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// `scheme:method@<encoded json>`
pub fn navigation_uri(scheme: &str, method: &str, payload: &str) -> String {
    format!("{scheme}:{method}@{}", encode_uri_component(payload))
}

/// The host application's invocation surface, as seen from the dashboard.
pub trait HostObject: Send + Sync {
    /// Whether the host environment is still there (connection alive).
    fn is_present(&self) -> bool;

    /// Whether `method` is exposed as a directly callable entry point.
    fn has_callable(&self, method: &str) -> bool;

    /// Call `method` with the JSON-serialized args as its only argument.
    fn call(&self, method: &str, payload: &str) -> Result<(), HostError>;

    /// Assign the location to `uri` (custom-scheme interception).
    fn navigate(&self, uri: &str) -> Result<(), HostError>;
}

pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, host: &dyn HostObject, method: &str, payload: &str) -> Result<(), BridgeError>;
}

pub struct DirectCallTransport;

impl Transport for DirectCallTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn send(&self, host: &dyn HostObject, method: &str, payload: &str) -> Result<(), BridgeError> {
        host.call(method, payload).map_err(BridgeError::from)
    }
}

pub struct UriNavigationTransport {
    scheme: String,
}

impl UriNavigationTransport {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl Default for UriNavigationTransport {
    fn default() -> Self {
        Self::new(DEFAULT_URI_SCHEME)
    }
}

impl Transport for UriNavigationTransport {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn send(&self, host: &dyn HostObject, method: &str, payload: &str) -> Result<(), BridgeError> {
        let uri = navigation_uri(&self.scheme, method, payload);
        host.navigate(&uri).map_err(BridgeError::from)
    }
}

/// Direct call when the host exposes `method`, navigation otherwise.
pub fn select_transport<'a>(
    host: &dyn HostObject,
    method: &str,
    fallback: &'a UriNavigationTransport,
) -> &'a dyn Transport {
    static DIRECT: DirectCallTransport = DirectCallTransport;
    if host.has_callable(method) {
        return &DIRECT;
    }
    fallback
}
