use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::bridge::{BridgeChannel, ChannelOptions, HostObject};
use crate::config::AppConfig;
use crate::features::{FeatureHook, FeatureKind, HookOptions};
use crate::notify::ToastLog;
use crate::registry::CallbackRegistry;
use crate::youtube::YoutubeClient;

/// Process-wide state shared by every HTTP handler.
pub struct AppState {
    /// Loaded once at startup; bridge options are taken from it at construction
    pub(crate) config: RwLock<AppConfig>,
    pub(crate) toasts: Arc<ToastLog>,
    pub(crate) channel: Arc<BridgeChannel>,
    /// Mounted feature hooks. A hook is mounted on first access and lives
    /// until it is explicitly unmounted.
    pub(crate) features: DashMap<FeatureKind, Arc<FeatureHook>>,
    /// Shared async HTTP client for upstream APIs
    pub(crate) http_client: reqwest::Client,
    /// Shutdown sender for the HTTP server: send () to gracefully stop it
    pub(crate) server_shutdown: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let toasts = Arc::new(ToastLog::new(config.toast_capacity));
        let registry = CallbackRegistry::new(toasts.clone());
        let channel = BridgeChannel::new(
            registry,
            ChannelOptions {
                uri_scheme: config.uri_scheme.clone(),
                request_timeout: config.request_timeout(),
            },
        );
        Arc::new(Self {
            config: RwLock::new(config),
            toasts,
            channel,
            features: DashMap::new(),
            http_client: reqwest::Client::new(),
            server_shutdown: Mutex::new(None),
        })
    }

    pub(crate) fn hook_options(&self) -> HookOptions {
        let config = self.config.read();
        HookOptions {
            mock_when_absent: config.mock_host_when_absent,
            mock_delay: config.mock_host_delay(),
        }
    }

    /// The hook for `kind`, mounting it if this is the first access. A hook
    /// mounted before the host attached asks it for defaults again.
    pub(crate) fn feature(&self, kind: FeatureKind) -> Arc<FeatureHook> {
        let existing = self.features.get(&kind).map(|hook| Arc::clone(hook.value()));
        if let Some(hook) = existing {
            hook.refresh_if_stale();
            return hook;
        }
        let options = self.hook_options();
        let entry = self
            .features
            .entry(kind)
            .or_insert_with(|| Arc::new(FeatureHook::mount(self.channel.clone(), kind, options)));
        Arc::clone(entry.value())
    }

    /// Capture a newly connected host and have every mounted hook ask it
    /// for its defaults.
    pub(crate) fn attach_host(&self, host: Arc<dyn HostObject>) {
        self.channel.attach(host);
        let hooks: Vec<Arc<FeatureHook>> = self
            .features
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        tracing::debug!(hooks = hooks.len(), "reloading feature defaults from new host");
        for hook in hooks {
            hook.load_defaults();
        }
    }

    pub(crate) fn is_mounted(&self, kind: FeatureKind) -> bool {
        self.features.contains_key(&kind)
    }

    /// Unmount and forget the hook for `kind`. Returns false if it was not mounted.
    pub(crate) fn unmount_feature(&self, kind: FeatureKind) -> bool {
        match self.features.remove(&kind) {
            Some((_, hook)) => {
                hook.unmount();
                true
            }
            None => false,
        }
    }

    /// Client for the video API, or None when no API key is configured.
    pub(crate) fn youtube_client(&self) -> Option<YoutubeClient> {
        let config = self.config.read();
        let key = config.resolved_youtube_api_key()?;
        Some(YoutubeClient::new(
            self.http_client.clone(),
            config.youtube_base_url.clone(),
            key,
        ))
    }
}
