//! Context and namespace selection.
//!
//! Tracks the active kubeconfig context, the namespace filter and the
//! cluster summary, and detects context changes made outside the app.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::BackgroundTask;

use crate::domain::{ClusterMetrics, KubeContext, PulseMetrics};
use crate::error::Result;
use crate::ports::CommandBridge;

/// Connection state of the active context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
    Connecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
        }
    }
}

#[derive(Debug, Default)]
struct SelectorState {
    contexts: Vec<KubeContext>,
    current_context: String,
    namespaces: Vec<String>,
    selected_namespace: Option<String>,
    cluster_metrics: Option<ClusterMetrics>,
    pulse_metrics: Option<PulseMetrics>,
    connection_status: ConnectionStatus,
    loading: bool,
    error: Option<String>,
}

/// Tracks the active context and namespace filter.
///
/// A context counts as selected once the backend has reported a non-empty
/// current context; until then every resource fetch is a no-op.
pub struct ContextSelector<B: CommandBridge> {
    bridge: Arc<B>,
    state: RwLock<SelectorState>,

    /// Refresh counter fanned out to every view.
    refresh_tx: watch::Sender<u64>,

    /// Background context poller.
    poll_task: Mutex<Option<BackgroundTask>>,
}

impl<B: CommandBridge + 'static> ContextSelector<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        let (refresh_tx, _) = watch::channel(0);
        Self {
            bridge,
            state: RwLock::new(SelectorState::default()),
            refresh_tx,
            poll_task: Mutex::new(None),
        }
    }

    // =========================================================================
    // Snapshot accessors
    // =========================================================================

    pub fn contexts(&self) -> Vec<KubeContext> {
        self.state.read().contexts.clone()
    }

    /// Name of the active context, or an empty string if none.
    pub fn current_context(&self) -> String {
        self.state.read().current_context.clone()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.read().namespaces.clone()
    }

    /// Selected namespace filter; `None` means all namespaces.
    pub fn selected_namespace(&self) -> Option<String> {
        self.state.read().selected_namespace.clone()
    }

    pub fn cluster_metrics(&self) -> Option<ClusterMetrics> {
        self.state.read().cluster_metrics.clone()
    }

    pub fn pulse_metrics(&self) -> Option<PulseMetrics> {
        self.state.read().pulse_metrics.clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.state.read().connection_status
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Last error written to the global error slot.
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Whether a context is selected and resource fetches may run.
    pub fn is_ready(&self) -> bool {
        !self.state.read().current_context.is_empty()
    }

    // =========================================================================
    // Global error slot & refresh signal
    // =========================================================================

    pub fn set_error(&self, message: impl Into<String>) {
        self.state.write().error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn select_namespace(&self, namespace: Option<String>) {
        debug!(namespace = ?namespace, "Namespace selected");
        self.state.write().selected_namespace = namespace;
    }

    /// Bump the refresh counter so every subscribed view re-fetches.
    pub fn trigger_refresh(&self) {
        self.refresh_tx.send_modify(|n| *n += 1);
    }

    pub fn refresh_count(&self) -> u64 {
        *self.refresh_tx.borrow()
    }

    /// Subscribe to refresh signals.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.refresh_tx.subscribe()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the context list and the current context.
    ///
    /// Marks the connection connected on success, disconnected on failure.
    pub async fn load_contexts(&self) {
        if let Err(e) = self.fetch_contexts().await {
            warn!(error = %e, "Failed to load contexts");
            let mut state = self.state.write();
            state.error = Some(e.message());
            state.connection_status = ConnectionStatus::Disconnected;
        }
    }

    /// Load namespace names for the active context.
    pub async fn load_namespaces(&self) {
        if let Err(e) = self.fetch_namespaces().await {
            warn!(error = %e, "Failed to load namespaces");
            self.set_error(e.message());
        }
    }

    /// Load the dashboard counters for the active context.
    pub async fn load_cluster_metrics(&self) {
        if let Err(e) = self.fetch_cluster_metrics().await {
            warn!(error = %e, "Failed to load cluster metrics");
            self.set_error(e.message());
        }
    }

    /// Load the health summary, limited to `namespace` when given.
    pub async fn load_pulse_metrics(&self, namespace: Option<&str>) {
        if !self.is_ready() {
            return;
        }
        match self
            .bridge
            .call::<PulseMetrics>("get_pulse_metrics", json!({ "namespace": namespace }))
            .await
        {
            Ok(metrics) => self.state.write().pulse_metrics = Some(metrics),
            Err(e) => {
                warn!(namespace = ?namespace, error = %e, "Failed to load pulse metrics");
                self.set_error(e.message());
            }
        }
    }

    /// Switch the active context.
    ///
    /// Resets the namespace filter, then reloads contexts, namespaces and
    /// cluster metrics in that order. The first failure stops the sequence
    /// and is recorded; the switch already requested of the backend is not
    /// rolled back. A failure before the context list reloads leaves the
    /// connection disconnected. Returns whether every step succeeded.
    pub async fn switch_context(&self, name: &str) -> bool {
        self.state.write().loading = true;
        info!(context = name, "Switching context");

        let result = self.run_switch(name).await;

        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(context = name, error = %e, "Context switch failed");
                state.error = Some(e.message());
                if state.connection_status == ConnectionStatus::Connecting {
                    state.connection_status = ConnectionStatus::Disconnected;
                }
                false
            }
        }
    }

    async fn run_switch(&self, name: &str) -> Result<()> {
        self.bridge
            .invoke("switch_context", json!({ "contextName": name }))
            .await?;

        {
            let mut state = self.state.write();
            state.current_context = name.to_string();
            state.selected_namespace = None;
            state.connection_status = ConnectionStatus::Connecting;
        }

        self.fetch_contexts().await?;
        self.fetch_namespaces().await?;
        self.fetch_cluster_metrics().await?;
        Ok(())
    }

    async fn fetch_contexts(&self) -> Result<()> {
        let contexts: Vec<KubeContext> = self
            .bridge
            .call("get_contexts", serde_json::Value::Null)
            .await?;
        self.state.write().contexts = contexts;

        let current: String = self
            .bridge
            .call("get_current_context", serde_json::Value::Null)
            .await?;

        let mut state = self.state.write();
        state.current_context = current;
        state.connection_status = ConnectionStatus::Connected;
        Ok(())
    }

    async fn fetch_namespaces(&self) -> Result<()> {
        if !self.is_ready() {
            return Ok(());
        }
        let namespaces: Vec<String> = self
            .bridge
            .call("get_namespaces", serde_json::Value::Null)
            .await?;
        self.state.write().namespaces = namespaces;
        Ok(())
    }

    async fn fetch_cluster_metrics(&self) -> Result<()> {
        if !self.is_ready() {
            return Ok(());
        }
        let metrics: ClusterMetrics = self
            .bridge
            .call("get_cluster_metrics", serde_json::Value::Null)
            .await?;
        self.state.write().cluster_metrics = Some(metrics);
        Ok(())
    }

    // =========================================================================
    // External change detection
    // =========================================================================

    /// Check once whether the current context changed outside the app.
    ///
    /// On change the namespace filter is reset, contexts and namespaces are
    /// reloaded and the refresh counter is bumped once. Errors are ignored.
    pub async fn poll_context_once(&self) -> bool {
        let current: String = match self
            .bridge
            .call("get_current_context", serde_json::Value::Null)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                debug!(error = %e, "Context poll failed");
                return false;
            }
        };

        let changed = {
            let mut state = self.state.write();
            if current.is_empty() || current == state.current_context {
                false
            } else {
                info!(
                    previous = %state.current_context,
                    current = %current,
                    "External context change detected"
                );
                state.current_context = current;
                state.selected_namespace = None;
                true
            }
        };

        if changed {
            self.load_contexts().await;
            self.load_namespaces().await;
            self.trigger_refresh();
        }
        changed
    }

    /// Start polling for external context changes.
    ///
    /// A second call while polling is running does nothing.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let mut task = self.poll_task.lock();
        if task.as_ref().is_some_and(BackgroundTask::is_running) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        *task = Some(BackgroundTask::spawn(move |mut stop| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stop.stopped() => break,
                    _ = ticker.tick() => {}
                }
                let Some(selector) = weak.upgrade() else {
                    break;
                };
                selector.poll_context_once().await;
            }
        }));
        debug!(?interval, "Context polling started");
    }

    /// Stop polling. A check already in flight still completes.
    ///
    /// Safe to call when not polling.
    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().take() {
            task.stop();
            debug!("Context polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task
            .lock()
            .as_ref()
            .is_some_and(BackgroundTask::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBackend;
    use crate::domain::ResourceCount;

    fn selector(backend: &Arc<InMemoryBackend>) -> Arc<ContextSelector<InMemoryBackend>> {
        Arc::new(ContextSelector::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_load_contexts_marks_connected() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);

        assert!(!selector.is_ready());
        selector.load_contexts().await;

        assert!(selector.is_ready());
        assert_eq!(selector.current_context(), "kind-dev");
        assert_eq!(selector.contexts().len(), 2);
        assert_eq!(selector.connection_status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_load_contexts_failure_marks_disconnected() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        backend.fail_next("get_contexts", "kubeconfig not found");
        let selector = selector(&backend);

        selector.load_contexts().await;

        assert_eq!(selector.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(selector.error().as_deref(), Some("kubeconfig not found"));
    }

    #[tokio::test]
    async fn test_namespaces_not_loaded_without_context() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);

        selector.load_namespaces().await;

        assert!(selector.namespaces().is_empty());
        assert_eq!(backend.call_count("get_namespaces"), 0);
    }

    #[tokio::test]
    async fn test_pulse_metrics_scoped_to_namespace() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);

        selector.load_pulse_metrics(None).await;
        assert!(selector.pulse_metrics().is_none());
        assert_eq!(backend.call_count("get_pulse_metrics"), 0);

        selector.load_contexts().await;
        selector.load_pulse_metrics(Some("default")).await;
        let pulse = selector.pulse_metrics().unwrap();
        assert_eq!(pulse.context, "kind-dev");
        assert_eq!(pulse.pods, ResourceCount { ok: 1, fail: 1 });
        assert_eq!(pulse.nodes, 1);

        selector.load_pulse_metrics(None).await;
        assert_eq!(selector.pulse_metrics().unwrap().pods.total(), 3);
    }

    #[tokio::test]
    async fn test_pulse_metrics_failure_keeps_previous() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        selector.load_pulse_metrics(None).await;

        backend.fail_next("get_pulse_metrics", "metrics unavailable");
        selector.load_pulse_metrics(Some("default")).await;

        assert_eq!(selector.error().as_deref(), Some("metrics unavailable"));
        assert_eq!(selector.pulse_metrics().unwrap().pods.total(), 3);
    }

    #[tokio::test]
    async fn test_switch_context_resets_namespace_and_reloads() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        selector.select_namespace(Some("kube-system".into()));

        assert!(selector.switch_context("prod").await);

        assert_eq!(selector.current_context(), "prod");
        assert_eq!(selector.selected_namespace(), None);
        assert!(selector.cluster_metrics().is_some());
        assert!(!selector.is_loading());
        assert_eq!(
            backend.commands(),
            vec![
                "get_contexts",
                "get_current_context",
                "switch_context",
                "get_contexts",
                "get_current_context",
                "get_namespaces",
                "get_cluster_metrics",
            ]
        );
    }

    #[tokio::test]
    async fn test_switch_context_aborts_on_first_failure() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        backend.fail_next("get_namespaces", "forbidden");

        assert!(!selector.switch_context("prod").await);

        assert_eq!(selector.error().as_deref(), Some("forbidden"));
        assert_eq!(backend.call_count("get_cluster_metrics"), 0);
        // the backend switch is not rolled back
        assert_eq!(backend.current_context(), "prod");
        assert!(!selector.is_loading());
        assert_eq!(selector.connection_status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_switch_context_failed_reload_marks_disconnected() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        backend.fail_next("get_contexts", "unauthorized");

        assert!(!selector.switch_context("prod").await);

        assert_eq!(selector.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(selector.error().as_deref(), Some("unauthorized"));
        assert_eq!(backend.call_count("get_namespaces"), 0);
    }

    #[tokio::test]
    async fn test_rejected_switch_keeps_connection() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;

        assert!(!selector.switch_context("missing").await);

        assert_eq!(selector.current_context(), "kind-dev");
        assert_eq!(selector.connection_status(), ConnectionStatus::Connected);
        assert!(selector.error().is_some());
    }

    #[tokio::test]
    async fn test_external_change_triggers_one_refresh() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        selector.select_namespace(Some("default".into()));
        let mut refreshes = selector.subscribe();

        // unchanged
        assert!(!selector.poll_context_once().await);
        assert_eq!(selector.refresh_count(), 0);

        backend.set_current_context_externally("prod");
        assert!(selector.poll_context_once().await);
        assert!(!selector.poll_context_once().await);
        assert!(!selector.poll_context_once().await);

        assert_eq!(selector.refresh_count(), 1);
        assert!(refreshes.has_changed().unwrap());
        assert_eq!(*refreshes.borrow_and_update(), 1);
        assert_eq!(selector.current_context(), "prod");
        assert_eq!(selector.selected_namespace(), None);
    }

    #[tokio::test]
    async fn test_poll_errors_are_ignored() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        backend.fail_next("get_current_context", "connection refused");

        assert!(!selector.poll_context_once().await);
        assert_eq!(selector.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_is_idempotent() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;

        selector.start_polling(Duration::from_secs(3));
        selector.start_polling(Duration::from_secs(3));
        assert!(selector.is_polling());

        backend.set_current_context_externally("prod");
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(selector.refresh_count(), 1);

        selector.stop_polling();
        selector.stop_polling();
        assert!(!selector.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_polling_lets_check_in_flight_finish() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let selector = selector(&backend);
        selector.load_contexts().await;
        backend.set_current_context_externally("prod");
        backend.script(
            "get_current_context",
            Duration::from_secs(5),
            Ok(serde_json::json!("prod")),
        );

        selector.start_polling(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        selector.stop_polling();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(selector.current_context(), "prod");
        assert_eq!(selector.refresh_count(), 1);
        assert_eq!(backend.call_count("get_namespaces"), 1);
    }
}
