//! KubeDesk Engine - Session state and background reconciliation.
//!
//! The engine owns one instance of every store for an application session
//! and wires them together. Front ends hold an `Arc<Engine<_>>`, read state
//! from the stores and call the engine to act.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::application::{
    BackgroundTask, ContextSelector, PortForwardManager, ResourceMirror, StartupSequencer,
};
use crate::config::Config;
use crate::domain::{NavigationState, SearchResults, View};
use crate::ports::CommandBridge;

/// The main KubeDesk engine.
///
/// # Usage Pattern
/// Call `initialize()` once, then `start_background_tasks()`. Views read
/// mirrored state through `selector()`, `mirror()` and `port_forwards()`;
/// the engine reloads the visible kind whenever the refresh signal fires.
pub struct Engine<B: CommandBridge> {
    bridge: Arc<B>,
    config: Config,

    // Stores
    selector: Arc<ContextSelector<B>>,
    mirror: Arc<ResourceMirror<B>>,
    port_forwards: Arc<PortForwardManager<B>>,
    startup: StartupSequencer<B>,

    // UI state
    navigation: RwLock<NavigationState>,
    search_query: RwLock<String>,

    /// Reloads the current view on every refresh signal.
    refresh_task: Mutex<Option<BackgroundTask>>,
}

impl<B: CommandBridge + 'static> Engine<B> {
    /// Create an engine for one session over `bridge`.
    pub fn new(bridge: Arc<B>, config: Config) -> Self {
        let selector = Arc::new(ContextSelector::new(Arc::clone(&bridge)));
        let mirror = Arc::new(
            ResourceMirror::new(Arc::clone(&bridge), Arc::clone(&selector))
                .with_discard_stale(config.discard_stale_completions),
        );
        let port_forwards = Arc::new(
            PortForwardManager::new(Arc::clone(&bridge))
                .with_notifications(config.port_forward_notifications),
        );
        let startup = StartupSequencer::new(Arc::clone(&bridge))
            .with_delays(config.startup_step_delay(), config.startup_settle_delay());
        let navigation = NavigationState {
            current_view: config.last_view,
            sidebar_collapsed: config.sidebar_collapsed,
        };

        Self {
            bridge,
            config,
            selector,
            mirror,
            port_forwards,
            startup,
            navigation: RwLock::new(navigation),
            search_query: RwLock::new(String::new()),
            refresh_task: Mutex::new(None),
        }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn selector(&self) -> &Arc<ContextSelector<B>> {
        &self.selector
    }

    pub fn mirror(&self) -> &Arc<ResourceMirror<B>> {
        &self.mirror
    }

    pub fn port_forwards(&self) -> &Arc<PortForwardManager<B>> {
        &self.port_forwards
    }

    pub fn startup(&self) -> &StartupSequencer<B> {
        &self.startup
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Run the startup checks, then load the initial cluster state.
    ///
    /// Returns whether the checks passed.
    pub async fn initialize(&self) -> bool {
        if !self.startup.run().await {
            return false;
        }
        self.selector.load_contexts().await;
        self.selector.load_namespaces().await;
        self.selector.load_cluster_metrics().await;
        self.port_forwards.list().await;
        info!(context = %self.selector.current_context(), "Engine initialized");
        true
    }

    /// Switch context and reload the visible kind.
    pub async fn switch_context(&self, name: &str) -> bool {
        let switched = self.selector.switch_context(name).await;
        if switched {
            self.refresh_current_view().await;
        }
        switched
    }

    /// Start context polling, port-forward polling and the refresh listener.
    ///
    /// Each task is started at most once.
    pub fn start_background_tasks(self: &Arc<Self>) {
        self.selector
            .start_polling(self.config.context_poll_interval());
        self.port_forwards
            .start_polling(self.config.port_forward_poll_interval());

        let mut task = self.refresh_task.lock();
        if task.as_ref().is_some_and(BackgroundTask::is_running) {
            return;
        }
        let mut refreshes = self.selector.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);
        *task = Some(BackgroundTask::spawn(move |mut stop| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.stopped() => break,
                    changed = refreshes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                debug!("Refresh signal received");
                engine.refresh_current_view().await;
            }
        }));
    }

    /// Stop every background task. Loads already in flight complete.
    ///
    /// Safe to call repeatedly.
    pub fn stop_background_tasks(&self) {
        self.selector.stop_polling();
        self.port_forwards.stop_polling();
        if let Some(task) = self.refresh_task.lock().take() {
            task.stop();
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn navigation(&self) -> NavigationState {
        *self.navigation.read()
    }

    pub fn current_view(&self) -> View {
        self.navigation.read().current_view
    }

    pub fn navigate(&self, view: View) {
        self.navigation.write().navigate(view);
    }

    pub fn toggle_sidebar(&self) {
        self.navigation.write().toggle_sidebar();
    }

    /// Reload whatever the current view shows, for the selected namespace.
    ///
    /// The dashboard reloads the cluster counters and the health summary.
    pub async fn refresh_current_view(&self) {
        let view = self.current_view();
        let namespace = self.selector.selected_namespace();
        match view.resource_kind() {
            Some(kind) => self.mirror.load_kind(kind, namespace.as_deref()).await,
            None => {
                self.selector.load_cluster_metrics().await;
                self.selector.load_pulse_metrics(namespace.as_deref()).await;
            }
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub fn set_search_query(&self, query: impl Into<String>) {
        *self.search_query.write() = query.into();
    }

    pub fn search_query(&self) -> String {
        self.search_query.read().clone()
    }

    /// Results for the current query; `None` while the query is blank.
    pub fn search(&self) -> Option<SearchResults> {
        let query = self.search_query();
        self.mirror.search(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBackend;
    use crate::domain::{PodInfo, ResourceKind};
    use std::time::Duration;

    fn engine() -> (Arc<InMemoryBackend>, Arc<Engine<InMemoryBackend>>) {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let engine = Arc::new(Engine::new(backend.clone(), Config::without_delays()));
        (backend, engine)
    }

    #[tokio::test]
    async fn test_initialize_loads_cluster_state() {
        let (_backend, engine) = engine();

        assert!(engine.initialize().await);

        assert!(engine.startup().is_initialized());
        assert!(engine.selector().is_ready());
        assert_eq!(engine.selector().namespaces().len(), 3);
        assert!(engine.selector().cluster_metrics().is_some());
    }

    #[tokio::test]
    async fn test_refresh_current_view_loads_visible_kind() {
        let (backend, engine) = engine();
        engine.initialize().await;

        engine.navigate(View::Pods);
        engine.selector().select_namespace(Some("default".into()));
        engine.refresh_current_view().await;

        let pods = engine.mirror().items::<PodInfo>();
        assert_eq!(pods.len(), 2);
        assert_eq!(backend.call_count("get_services"), 0);
    }

    #[tokio::test]
    async fn test_dashboard_refresh_loads_pulse_for_selected_namespace() {
        let (backend, engine) = engine();
        engine.initialize().await;

        engine.navigate(View::Dashboard);
        engine.selector().select_namespace(Some("kube-system".into()));
        engine.refresh_current_view().await;

        let pulse = engine.selector().pulse_metrics().unwrap();
        assert_eq!(pulse.pods.ok, 1);
        assert_eq!(pulse.deployments.total(), 1);
        let call = backend
            .calls()
            .into_iter()
            .find(|c| c.command == "get_pulse_metrics")
            .unwrap();
        assert_eq!(call.args["namespace"], "kube-system");
    }

    #[tokio::test]
    async fn test_search_is_inactive_for_blank_query() {
        let (_backend, engine) = engine();
        engine.initialize().await;
        engine.mirror().load_all(None).await;

        engine.set_search_query("   ");
        assert!(engine.search().is_none());

        engine.set_search_query("coredns");
        let results = engine.search().unwrap();
        assert_eq!(results.count(ResourceKind::Pods), 1);
        assert_eq!(results.count(ResourceKind::Deployments), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_context_change_reloads_current_view() {
        let (backend, engine) = engine();
        engine.initialize().await;
        engine.navigate(View::Services);
        engine.start_background_tasks();
        engine.start_background_tasks();

        backend.set_current_context_externally("prod");
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(engine.selector().current_context(), "prod");
        assert_eq!(engine.selector().refresh_count(), 1);
        assert_eq!(backend.call_count("get_services"), 1);
        engine.stop_background_tasks();
        engine.stop_background_tasks();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_background_tasks_lets_view_load_finish() {
        let (backend, engine) = engine();
        engine.initialize().await;
        engine.navigate(View::Services);
        backend.script("get_services", Duration::from_secs(5), Ok(serde_json::json!([])));
        engine.start_background_tasks();

        engine.selector().trigger_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(engine.mirror().status(ResourceKind::Services).loading);

        engine.stop_background_tasks();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let status = engine.mirror().status(ResourceKind::Services);
        assert!(!status.loading);
        assert_eq!(status.revision, 1);
        assert_eq!(backend.call_count("get_services"), 1);
    }
}
