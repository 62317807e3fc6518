//! User-facing notifications ("toasts").
//!
//! Every bridge outcome the dashboard shows to the user goes through a
//! [`Notifier`]. The production notifier is [`ToastLog`]: a fixed-capacity
//! circular buffer the browser polls via `GET /api/toasts`. Each toast is also
//! emitted as a tracing event so the service log mirrors what the user saw.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// A notification waiting to be shown (or already shown) in the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub timestamp_ms: i64,
    pub kind: ToastKind,
    pub message: String,
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: ToastKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(ToastKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(ToastKind::Error, message);
    }
}

// ---------------------------------------------------------------------------
// Ring buffer
// ---------------------------------------------------------------------------

pub const DEFAULT_TOAST_CAPACITY: usize = 200;

struct ToastRing {
    entries: Vec<Option<Toast>>,
    capacity: usize,
    /// Write position (wraps around)
    write_pos: usize,
    count: usize,
    next_id: u64,
}

impl ToastRing {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self {
            entries,
            capacity,
            write_pos: 0,
            count: 0,
            next_id: 1,
        }
    }

    fn push(&mut self, kind: ToastKind, message: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.entries[self.write_pos] = Some(Toast {
            id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            kind,
            message,
        });
        self.write_pos = (self.write_pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
        id
    }

    fn entries(&self, limit: usize) -> Vec<Toast> {
        if self.count == 0 {
            return Vec::new();
        }
        let effective_limit = if limit == 0 { self.count } else { limit.min(self.count) };
        // write_pos points to the oldest entry once the buffer is full
        let start = if self.count < self.capacity { 0 } else { self.write_pos };
        let skip = self.count - effective_limit;

        (skip..self.count)
            .filter_map(|i| self.entries[(start + i) % self.capacity].clone())
            .collect()
    }

    fn clear(&mut self) {
        for slot in self.entries.iter_mut() {
            *slot = None;
        }
        self.write_pos = 0;
        self.count = 0;
        // next_id stays monotonic
    }
}

/// Thread-safe toast store shared by the bridge, the registry and the HTTP API.
pub struct ToastLog {
    ring: Mutex<ToastRing>,
}

impl ToastLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(ToastRing::new(capacity)),
        }
    }

    /// Most recent `limit` toasts in chronological order (0 = all).
    pub fn entries(&self, limit: usize) -> Vec<Toast> {
        self.ring.lock().entries(limit)
    }

    pub fn clear(&self) {
        self.ring.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToastLog {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_CAPACITY)
    }
}

impl Notifier for ToastLog {
    fn notify(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Error => tracing::warn!(toast = "error", "{message}"),
            ToastKind::Success => tracing::info!(toast = "success", "{message}"),
            ToastKind::Info => tracing::info!(toast = "info", "{message}"),
        }
        self.ring.lock().push(kind, message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_monotonic_ids() {
        let log = ToastLog::new(10);
        log.success("first");
        log.error("second");
        let entries = log.entries(0);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 2);
        assert_eq!(entries[1].kind, ToastKind::Error);
    }

    #[test]
    fn entries_with_limit_returns_most_recent() {
        let log = ToastLog::new(10);
        log.success("a");
        log.success("b");
        log.success("c");

        let entries = log.entries(2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "b");
        assert_eq!(entries[1].message, "c");
    }

    #[test]
    fn ring_wraps_and_drops_oldest() {
        let log = ToastLog::new(3);
        for i in 0..5 {
            log.notify(ToastKind::Info, &format!("msg-{i}"));
        }
        assert_eq!(log.len(), 3);
        let entries = log.entries(0);
        assert_eq!(entries[0].message, "msg-2");
        assert_eq!(entries[2].message, "msg-4");
    }

    #[test]
    fn clear_keeps_ids_monotonic() {
        let log = ToastLog::new(4);
        log.success("a");
        log.success("b");
        log.clear();
        assert!(log.is_empty());

        log.error("after-clear");
        assert_eq!(log.entries(0)[0].id, 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = ToastLog::new(0);
        log.success("only");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn kind_parse() {
        assert_eq!(ToastKind::parse("error"), Some(ToastKind::Error));
        assert_eq!(ToastKind::parse("success"), Some(ToastKind::Success));
        assert_eq!(ToastKind::parse("nope"), None);
    }
}
