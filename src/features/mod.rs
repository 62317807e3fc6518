//! Feature hooks: one per SketchUp tool the dashboard drives.
//!
//! Mounting a hook installs its callback slots, asks the host for the
//! feature's current defaults and keeps the last snapshot it received.
//! Actions merge caller arguments over that snapshot field by field and fire
//! them through the bridge. Dropping or unmounting the hook removes its slots.

pub mod block_import;
pub mod catalog;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::bridge::{BridgeChannel, BridgeError, BridgeResponse};
use crate::registry::{HandlerSpec, Registration, notify_outcome};

pub use catalog::{CATALOG, DefaultValue, FeatureAction, FeatureDescriptor, FeatureKind, MergePolicy};

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
    #[error("feature '{feature}' has no action '{action}'")]
    UnknownAction { feature: FeatureKind, action: String },
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Last-known host configuration for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DefaultsSnapshot(Map<String, Value>);

impl DefaultsSnapshot {
    pub fn initial(descriptor: &FeatureDescriptor) -> Self {
        Self(
            descriptor
                .initial_defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_value()))
                .collect(),
        )
    }

    pub fn apply(&mut self, policy: MergePolicy, incoming: Map<String, Value>) {
        match policy {
            MergePolicy::Replace => self.0 = incoming,
            MergePolicy::Merge => self.0.extend(incoming),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Build the outbound args for `action`: each declared field takes the
/// caller's value unless it is absent or null, then the snapshot's. Extra
/// caller keys pass through untouched.
pub fn merge_args(
    action: &FeatureAction,
    defaults: &DefaultsSnapshot,
    mut args: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = Map::new();
    for &field in action.fields {
        let value = args
            .remove(field)
            .filter(|v| !v.is_null())
            .or_else(|| defaults.get(field).cloned());
        if let Some(value) = value {
            merged.insert(field.to_string(), value);
        }
    }
    merged.extend(args);
    merged
}

#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    /// Simulate the host for block browsers when it is absent
    pub mock_when_absent: bool,
    pub mock_delay: Duration,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            mock_when_absent: true,
            mock_delay: Duration::from_millis(400),
        }
    }
}

pub struct FeatureHook {
    descriptor: &'static FeatureDescriptor,
    channel: Arc<BridgeChannel>,
    defaults: Arc<RwLock<DefaultsSnapshot>>,
    options: HookOptions,
    /// Set when the last defaults request could not reach a real host
    awaiting_host: AtomicBool,
    registration: Registration,
}

impl FeatureHook {
    pub fn mount(channel: Arc<BridgeChannel>, kind: FeatureKind, options: HookOptions) -> Self {
        let descriptor = kind.descriptor();
        let defaults = Arc::new(RwLock::new(DefaultsSnapshot::initial(descriptor)));

        let receiver = {
            let defaults = Arc::clone(&defaults);
            let policy = descriptor.policy;
            HandlerSpec::custom(move |payload| match payload.as_object() {
                Some(incoming) => defaults.write().apply(policy, incoming.clone()),
                None => tracing::warn!(feature = %kind, "ignoring non-object defaults payload"),
            })
        };
        let handlers = std::iter::once((descriptor.defaults_callback, receiver)).chain(
            descriptor
                .actions
                .iter()
                .map(|a| (a.result_callback, HandlerSpec::Toast)),
        );
        let registration = channel.registry().register(handlers);

        let hook = Self {
            descriptor,
            channel,
            defaults,
            options,
            awaiting_host: AtomicBool::new(false),
            registration,
        };
        tracing::debug!(feature = %kind, "feature hook mounted");
        hook.load_defaults();
        hook
    }

    pub fn kind(&self) -> FeatureKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &'static FeatureDescriptor {
        self.descriptor
    }

    pub fn defaults(&self) -> DefaultsSnapshot {
        self.defaults.read().clone()
    }

    /// Ask the host for the current defaults again.
    pub fn load_defaults(&self) {
        self.awaiting_host
            .store(!self.channel.is_available(), Ordering::SeqCst);
        if let Some(mock) = self.simulated() {
            deliver_later(
                &self.channel,
                self.descriptor.defaults_callback,
                block_import::list_payload(mock),
                self.options.mock_delay,
            );
            return;
        }
        self.channel.invoke(self.descriptor.load_method, Map::new());
    }

    /// True when the last defaults request found no host to ask.
    pub fn awaiting_host(&self) -> bool {
        self.awaiting_host.load(Ordering::SeqCst)
    }

    /// Request defaults again if the last attempt found no host and one is
    /// available now. Returns whether a request was made.
    pub fn refresh_if_stale(&self) -> bool {
        if !self.awaiting_host() || !self.channel.is_available() {
            return false;
        }
        tracing::debug!(feature = %self.kind(), "host now available, reloading defaults");
        self.load_defaults();
        true
    }

    /// Fire `action` with `args` merged over the current defaults.
    pub fn start(&self, action: &str, args: Map<String, Value>) -> Result<(), FeatureError> {
        let action = self.action(action)?;
        let merged = merge_args(action, &self.defaults.read(), args);

        if self.simulated().is_some() {
            deliver_later(
                &self.channel,
                action.result_callback,
                block_import::import_payload(&merged),
                self.options.mock_delay,
            );
            return Ok(());
        }
        self.channel.invoke(action.method, merged);
        Ok(())
    }

    /// Like [`start`](Self::start) but waits for the host's correlated answer.
    pub async fn start_and_wait(
        &self,
        action: &str,
        args: Map<String, Value>,
    ) -> Result<BridgeResponse, FeatureError> {
        let action = self.action(action)?;
        let merged = merge_args(action, &self.defaults.read(), args);

        if self.simulated().is_some() {
            tokio::time::sleep(self.options.mock_delay).await;
            let response = BridgeResponse::from_value(block_import::import_payload(&merged));
            notify_outcome(self.channel.notifier().as_ref(), response.success, &response.message);
            return Ok(response);
        }
        Ok(self.channel.request(action.method, merged).await?)
    }

    /// Remove this hook's callback slots. Also happens on drop.
    pub fn unmount(&self) {
        self.registration.cleanup();
        tracing::debug!(feature = %self.kind(), "feature hook unmounted");
    }

    fn action(&self, key: &str) -> Result<&'static FeatureAction, FeatureError> {
        self.descriptor
            .action(key)
            .ok_or_else(|| FeatureError::UnknownAction {
                feature: self.kind(),
                action: key.to_string(),
            })
    }

    fn simulated(&self) -> Option<&'static block_import::BlockMock> {
        let mock = self.descriptor.mock?;
        (self.options.mock_when_absent && !self.channel.is_available()).then_some(mock)
    }
}

/// Deliver `payload` to `callback` after `delay`, as if the host had answered.
fn deliver_later(channel: &Arc<BridgeChannel>, callback: &'static str, payload: Value, delay: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        channel.deliver(callback, payload);
        return;
    };
    let channel = Arc::clone(channel);
    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        channel.deliver(callback, payload);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelOptions;
    use crate::bridge::transport::testing::{FakeHost, HostCall};
    use crate::notify::{ToastKind, ToastLog};
    use crate::registry::CallbackRegistry;
    use serde_json::json;

    fn setup() -> (Arc<BridgeChannel>, Arc<ToastLog>) {
        let toasts = Arc::new(ToastLog::new(32));
        let registry = CallbackRegistry::new(toasts.clone());
        (BridgeChannel::new(registry, ChannelOptions::default()), toasts)
    }

    fn with_host(methods: &[&str]) -> (Arc<BridgeChannel>, Arc<FakeHost>, Arc<ToastLog>) {
        let (channel, toasts) = setup();
        let host = Arc::new(FakeHost::with_methods(methods));
        channel.attach(host.clone());
        (channel, host, toasts)
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn no_mock() -> HookOptions {
        HookOptions {
            mock_when_absent: false,
            ..HookOptions::default()
        }
    }

    /// Seed a snapshot with `{a, b}` then deliver `{b}` alone.
    fn partial_update(kind: FeatureKind) -> DefaultsSnapshot {
        let (channel, _, _) = with_host(&[]);
        let hook = FeatureHook::mount(channel.clone(), kind, no_mock());
        let callback = kind.descriptor().defaults_callback;
        channel.deliver(callback, json!({"a": 1, "b": 2}));
        channel.deliver(callback, json!({"b": 3}));
        hook.defaults()
    }

    fn assert_policy(kind: FeatureKind, expected: MergePolicy) {
        assert_eq!(kind.descriptor().policy, expected, "{kind}");
        let snapshot = partial_update(kind);
        assert_eq!(snapshot.get("b"), Some(&json!(3)), "{kind}");
        match expected {
            MergePolicy::Merge => assert_eq!(snapshot.get("a"), Some(&json!(1)), "{kind}"),
            MergePolicy::Replace => assert_eq!(snapshot.get("a"), None, "{kind}"),
        }
    }

    #[test]
    fn room_annotation_merges_defaults() {
        assert_policy(FeatureKind::RoomAnnotation, MergePolicy::Merge);
    }

    #[test]
    fn ceiling_annotation_replaces_defaults() {
        assert_policy(FeatureKind::CeilingAnnotation, MergePolicy::Replace);
    }

    #[test]
    fn lighting_annotation_merges_defaults() {
        assert_policy(FeatureKind::LightingAnnotation, MergePolicy::Merge);
    }

    #[test]
    fn component_updater_replaces_defaults() {
        assert_policy(FeatureKind::ComponentUpdater, MergePolicy::Replace);
    }

    #[test]
    fn height_annotation_merges_defaults() {
        assert_policy(FeatureKind::HeightAnnotation, MergePolicy::Merge);
    }

    #[test]
    fn section_annotation_replaces_defaults() {
        assert_policy(FeatureKind::SectionAnnotation, MergePolicy::Replace);
    }

    #[test]
    fn view_indication_merges_defaults() {
        assert_policy(FeatureKind::ViewIndication, MergePolicy::Merge);
    }

    #[test]
    fn circuit_connection_replaces_defaults() {
        assert_policy(FeatureKind::CircuitConnection, MergePolicy::Replace);
    }

    #[test]
    fn block_browsers_replace_lists() {
        assert_policy(FeatureKind::ElectricalBlocks, MergePolicy::Replace);
        assert_policy(FeatureKind::LightingBlocks, MergePolicy::Replace);
        assert_policy(FeatureKind::BaseboardBlocks, MergePolicy::Replace);
    }

    #[test]
    fn room_report_merges_defaults() {
        assert_policy(FeatureKind::RoomReport, MergePolicy::Merge);
    }

    #[test]
    fn electrical_report_replaces_defaults() {
        assert_policy(FeatureKind::ElectricalReport, MergePolicy::Replace);
    }

    #[test]
    fn mount_requests_defaults_from_host() {
        let (channel, host, _) = with_host(&["loadLightingAnnotationDefaults"]);
        let hook = FeatureHook::mount(channel.clone(), FeatureKind::LightingAnnotation, no_mock());

        assert_eq!(
            host.calls(),
            vec![HostCall::Direct {
                method: "loadLightingAnnotationDefaults".into(),
                payload: "{}".into(),
            }]
        );
        assert!(channel.registry().is_registered("handleLightingAnnotationDefaults"));
        assert!(channel.registry().is_registered("handleLightingAnnotationResult"));
        assert_eq!(hook.defaults().get("power"), Some(&json!(60)));
    }

    #[test]
    fn start_falls_back_per_field() {
        let (channel, host, _) = with_host(&["startCeilingAnnotation"]);
        let hook = FeatureHook::mount(channel.clone(), FeatureKind::CeilingAnnotation, no_mock());
        channel.deliver(
            "handleCeilingAnnotationDefaults",
            json!({"ceilingHeight": 2.6, "finish": "Madeira", "showFinish": false, "scale": 50}),
        );

        hook.start(
            "start",
            obj(json!({"ceilingHeight": 3.0, "finish": null, "note": "sala"})),
        )
        .unwrap();

        let Some(HostCall::Direct { method, payload }) = host.calls().pop() else {
            panic!("expected a direct call");
        };
        assert_eq!(method, "startCeilingAnnotation");
        let sent: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            sent,
            json!({
                "ceilingHeight": 3.0,
                "finish": "Madeira",
                "showFinish": false,
                "scale": 50,
                "note": "sala"
            })
        );
    }

    #[test]
    fn unknown_action_is_an_error() {
        let (channel, _, _) = with_host(&[]);
        let hook = FeatureHook::mount(channel, FeatureKind::RoomReport, no_mock());
        let err = hook.start("print", Map::new()).unwrap_err();
        assert!(matches!(err, FeatureError::UnknownAction { .. }));
    }

    #[test]
    fn result_callback_toasts() {
        let (channel, _, toasts) = with_host(&[]);
        let _hook = FeatureHook::mount(channel.clone(), FeatureKind::HeightAnnotation, no_mock());

        channel.deliver(
            "handlePrintAnnotationResult",
            json!({"success": false, "message": "Nenhuma cena selecionada"}),
        );
        let last = toasts.entries(1).pop().unwrap();
        assert_eq!(last.kind, ToastKind::Error);
        assert_eq!(last.message, "Nenhuma cena selecionada");
    }

    #[test]
    fn unmount_removes_slots_and_is_idempotent() {
        let (channel, _, _) = with_host(&[]);
        let hook = FeatureHook::mount(channel.clone(), FeatureKind::SectionAnnotation, no_mock());
        hook.unmount();
        hook.unmount();
        assert!(!channel.registry().is_registered("handleSectionAnnotationDefaults"));
        assert!(!channel.registry().is_registered("handleSectionAnnotationResult"));
    }

    #[test]
    fn remount_survives_old_hook_cleanup() {
        let (channel, _, _) = with_host(&[]);
        let old = FeatureHook::mount(channel.clone(), FeatureKind::ViewIndication, no_mock());
        let new = FeatureHook::mount(channel.clone(), FeatureKind::ViewIndication, no_mock());
        drop(old);

        channel.deliver("handleViewIndicationDefaults", json!({"number": 7}));
        assert_eq!(new.defaults().get("number"), Some(&json!(7)));
    }

    #[test]
    fn unavailable_host_soft_fails_on_mount() {
        let (channel, toasts) = setup();
        let hook = FeatureHook::mount(channel, FeatureKind::RoomAnnotation, no_mock());
        assert_eq!(toasts.len(), 1);
        assert!(hook.start("start", Map::new()).is_ok());
        assert_eq!(toasts.len(), 2);
    }

    #[test]
    fn block_browser_without_runtime_mocks_immediately() {
        let (channel, toasts) = setup();
        let hook = FeatureHook::mount(channel, FeatureKind::BaseboardBlocks, HookOptions::default());

        let blocks = hook.defaults().get("blocks").cloned().unwrap();
        assert_eq!(blocks.as_array().unwrap().len(), 3);

        hook.start("import", obj(json!({"blockPath": "rodapes/madeira_15cm.skp"})))
            .unwrap();
        let toast = toasts.entries(0).pop().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert!(toast.message.contains("madeira_15cm"));
    }

    #[tokio::test]
    async fn block_browser_mock_arrives_after_delay() {
        let (channel, _) = setup();
        let hook = FeatureHook::mount(
            channel,
            FeatureKind::ElectricalBlocks,
            HookOptions {
                mock_when_absent: true,
                mock_delay: Duration::from_millis(10),
            },
        );
        assert!(hook.defaults().get("blocks").is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(hook.defaults().get("blocks").is_some());
    }

    #[test]
    fn block_browser_uses_host_when_present() {
        let (channel, host, _) = with_host(&[]);
        let _hook = FeatureHook::mount(channel, FeatureKind::LightingBlocks, HookOptions::default());
        assert_eq!(
            host.calls(),
            vec![HostCall::Navigate("skp:loadLightingBlocks@%7B%7D".into())]
        );
    }

    #[tokio::test]
    async fn block_browser_waited_import_is_simulated() {
        let (channel, toasts) = setup();
        let hook = FeatureHook::mount(
            channel,
            FeatureKind::BaseboardBlocks,
            HookOptions {
                mock_when_absent: true,
                mock_delay: Duration::from_millis(1),
            },
        );

        let resp = hook
            .start_and_wait("import", obj(json!({"blockPath": "rodapes/madeira_15cm.skp"})))
            .await
            .unwrap();
        assert!(resp.success);
        assert!(resp.message.contains("madeira_15cm"));

        let toast = toasts.entries(0).pop().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert_eq!(toast.message, resp.message);
    }

    #[tokio::test]
    async fn waited_action_without_host_is_unavailable_for_real_features() {
        let (channel, _) = setup();
        let hook = FeatureHook::mount(channel, FeatureKind::RoomReport, HookOptions::default());
        let err = hook.start_and_wait("export", Map::new()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Bridge(BridgeError::Unavailable)));
    }

    #[test]
    fn defaults_reload_once_host_attaches() {
        let (channel, _) = setup();
        let hook = FeatureHook::mount(channel.clone(), FeatureKind::LightingAnnotation, no_mock());
        assert!(hook.awaiting_host());
        assert!(!hook.refresh_if_stale());

        let host = Arc::new(FakeHost::with_methods(&["loadLightingAnnotationDefaults"]));
        channel.attach(host.clone());

        assert!(hook.refresh_if_stale());
        assert_eq!(
            host.calls(),
            vec![HostCall::Direct {
                method: "loadLightingAnnotationDefaults".into(),
                payload: "{}".into(),
            }]
        );
        assert!(!hook.awaiting_host());
        assert!(!hook.refresh_if_stale());
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn mocked_block_list_is_replaced_by_host_list() {
        let (channel, _) = setup();
        let hook = FeatureHook::mount(channel.clone(), FeatureKind::ElectricalBlocks, HookOptions::default());
        assert!(hook.awaiting_host());

        let host = Arc::new(FakeHost::with_methods(&[]));
        channel.attach(host.clone());
        assert!(hook.refresh_if_stale());
        assert_eq!(
            host.calls(),
            vec![HostCall::Navigate("skp:loadElectricalBlocks@%7B%7D".into())]
        );

        channel.deliver(
            kind_callback(FeatureKind::ElectricalBlocks),
            json!({"success": true, "blocks": [{"name": "Tomada real"}]}),
        );
        let blocks = hook.defaults().get("blocks").cloned().unwrap();
        assert_eq!(blocks, json!([{"name": "Tomada real"}]));
    }

    fn kind_callback(kind: FeatureKind) -> &'static str {
        kind.descriptor().defaults_callback
    }

    #[test]
    fn merge_args_skips_fields_nobody_knows() {
        let action = FeatureKind::ElectricalBlocks.descriptor().action("import").unwrap();
        let merged = merge_args(action, &DefaultsSnapshot::default(), Map::new());
        assert!(merged.is_empty());
    }
}
