//! Handler registry: named inbound slots the CAD host calls back into.
//!
//! The host delivers results by name (`handleRoomAnnotationResult`, ...).
//! A slot holds exactly one handler; registering the same name again replaces
//! it without warning. Components register their slots in bulk and get a
//! [`Registration`] back that removes them again on cleanup or drop.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::notify::Notifier;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Operação concluída com sucesso";
pub const DEFAULT_ERROR_MESSAGE: &str = "Ocorreu um erro na operação";

pub type CallbackFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// What to install under a callback name.
pub enum HandlerSpec {
    /// Standard `{success, message}` handler that raises a success or error toast.
    Toast,
    /// Installed verbatim; any notification is the handler's business.
    Custom(CallbackFn),
}

impl HandlerSpec {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

/// Result of routing one inbound host delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A named handler ran.
    Delivered,
    /// The payload carried a pending request id and resolved that request.
    Correlated,
    /// Nothing was registered under the name; the payload was dropped.
    Unhandled,
}

/// Raise the toast a `{success, message}` response asks for.
pub fn notify_response(notifier: &dyn Notifier, payload: &Value) {
    let success = payload.get("success").and_then(Value::as_bool).unwrap_or(false);
    let message = payload.get("message").and_then(Value::as_str).unwrap_or("");
    notify_outcome(notifier, success, message);
}

/// Success or error toast, with a generic message when the host sent none.
pub fn notify_outcome(notifier: &dyn Notifier, success: bool, message: &str) {
    let message = Some(message).filter(|m| !m.trim().is_empty());
    if success {
        notifier.success(message.unwrap_or(DEFAULT_SUCCESS_MESSAGE));
    } else {
        notifier.error(message.unwrap_or(DEFAULT_ERROR_MESSAGE));
    }
}

struct Slot {
    /// Token of the registration that installed this handler
    token: u64,
    handler: CallbackFn,
}

pub struct CallbackRegistry {
    slots: DashMap<String, Slot>,
    next_token: AtomicU64,
    notifier: Arc<dyn Notifier>,
}

impl CallbackRegistry {
    pub fn new(notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            slots: DashMap::new(),
            next_token: AtomicU64::new(1),
            notifier,
        })
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Install every handler in `handlers`. Existing slots with the same name
    /// are overwritten (last writer wins).
    pub fn register<I, S>(self: &Arc<Self>, handlers: I) -> Registration
    where
        I: IntoIterator<Item = (S, HandlerSpec)>,
        S: Into<String>,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut names = Vec::new();

        for (name, spec) in handlers {
            let name = name.into();
            let handler = match spec {
                HandlerSpec::Toast => {
                    let notifier = self.notifier.clone();
                    Arc::new(move |payload: &Value| notify_response(notifier.as_ref(), payload))
                        as CallbackFn
                }
                HandlerSpec::Custom(f) => f,
            };
            if self.slots.insert(name.clone(), Slot { token, handler }).is_some() {
                tracing::debug!(callback = %name, "replaced existing callback handler");
            }
            names.push(name);
        }

        Registration {
            registry: Arc::downgrade(self),
            names,
            token,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Remove a slot regardless of who installed it. Absent names are fine.
    pub fn unregister(&self, name: &str) -> bool {
        self.slots.remove(name).is_some()
    }

    /// Run the handler currently registered under `name`.
    pub fn dispatch(&self, name: &str, payload: &Value) -> DispatchOutcome {
        // Clone the handler out so the shard lock is released before it runs;
        // handlers are allowed to register or clean up slots themselves.
        let handler = match self.slots.get(name) {
            Some(slot) => slot.handler.clone(),
            None => {
                tracing::warn!(callback = name, "no handler registered, dropping host delivery");
                return DispatchOutcome::Unhandled;
            }
        };
        handler(payload);
        DispatchOutcome::Delivered
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Handle to a batch of installed slots.
///
/// `cleanup` is idempotent and also runs on drop. A slot that has since been
/// taken over by a newer registration is left in place.
#[must_use = "dropping a Registration removes its handlers"]
pub struct Registration {
    registry: Weak<CallbackRegistry>,
    names: Vec<String>,
    token: u64,
    cleaned: AtomicBool,
}

impl Registration {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        for name in &self.names {
            registry.slots.remove_if(name, |_, slot| slot.token == self.token);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cleanup();
    }
}
