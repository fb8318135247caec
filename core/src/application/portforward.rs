//! Port-forward session manager.
//!
//! Mirrors the backend's port-forward sessions, starts and stops them, and
//! reconciles by polling. The backend owns every session; this manager only
//! replaces its whole mirrored collection after a fetch.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::BackgroundTask;

use crate::domain::{
    AvailablePort, PortForwardNotification, PortForwardRequest, PortForwardSession,
    PortForwardStatus, ResourceType,
};
use crate::error::{Error, Result};
use crate::ports::CommandBridge;

/// Default reconciliation interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct SessionState {
    sessions: Vec<PortForwardSession>,
    /// `list` calls awaiting the backend.
    in_flight: usize,
    error: Option<String>,
}

/// Manages port-forward sessions through the command bridge.
pub struct PortForwardManager<B: CommandBridge> {
    bridge: Arc<B>,

    /// Mirrored sessions, loading counter and error slot.
    state: RwLock<SessionState>,

    /// Pending notifications.
    pending_notifications: RwLock<Vec<PortForwardNotification>>,
    notifications_enabled: bool,

    /// Background reconciliation task.
    poll_task: Mutex<Option<BackgroundTask>>,
}

impl<B: CommandBridge + 'static> PortForwardManager<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self {
            bridge,
            state: RwLock::new(SessionState::default()),
            pending_notifications: RwLock::new(Vec::new()),
            notifications_enabled: true,
            poll_task: Mutex::new(None),
        }
    }

    /// Enable or disable notification queueing.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    // =========================================================================
    // Snapshot accessors
    // =========================================================================

    pub fn sessions(&self) -> Vec<PortForwardSession> {
        self.state.read().sessions.clone()
    }

    pub fn find(&self, id: &str) -> Option<PortForwardSession> {
        self.state
            .read()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Sessions that are starting or active.
    pub fn active_count(&self) -> usize {
        self.state
            .read()
            .sessions
            .iter()
            .filter(|s| s.status.is_live())
            .count()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Fetch and replace the mirrored session list.
    ///
    /// On failure the error is recorded and the previous list is kept.
    pub async fn list(&self) -> Vec<PortForwardSession> {
        {
            let mut state = self.state.write();
            state.in_flight += 1;
            state.error = None;
        }

        let result = self
            .bridge
            .call::<Vec<PortForwardSession>>("list_port_forwards", Value::Null)
            .await;

        let notifications = {
            let mut state = self.state.write();
            state.in_flight = state.in_flight.saturating_sub(1);
            match result {
                Ok(sessions) => {
                    let notifications = self.diff(&state.sessions, &sessions);
                    state.sessions = sessions;
                    notifications
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load port forwards");
                    state.error = Some(e.message());
                    Vec::new()
                }
            }
        };

        if !notifications.is_empty() {
            self.pending_notifications.write().extend(notifications);
        }
        self.sessions()
    }

    /// Compare two listings and log/queue the status changes between them.
    fn diff(
        &self,
        previous: &[PortForwardSession],
        current: &[PortForwardSession],
    ) -> Vec<PortForwardNotification> {
        let before: HashMap<&str, &PortForwardSession> =
            previous.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut notifications = Vec::new();

        for session in current {
            let old_status = before.get(session.id.as_str()).map(|s| s.status);
            if let Some(old) = old_status {
                if !old.can_transition_to(session.status) {
                    warn!(
                        session_id = %session.id,
                        from = old.as_str(),
                        to = session.status.as_str(),
                        "Backend reported an illegal status transition"
                    );
                }
            }
            if old_status == Some(session.status) {
                continue;
            }

            debug!(
                session_id = %session.id,
                status = session.status.as_str(),
                "Port forward status changed"
            );
            match session.status {
                PortForwardStatus::Active => {
                    notifications.push(PortForwardNotification::Connected {
                        session_id: session.id.clone(),
                        local_port: session.local_port,
                        target: session.target(),
                    })
                }
                PortForwardStatus::Error => notifications.push(PortForwardNotification::Failed {
                    session_id: session.id.clone(),
                    local_port: session.local_port,
                    target: session.target(),
                }),
                PortForwardStatus::Starting | PortForwardStatus::Stopped => {}
            }
        }

        for old in previous {
            let still_listed = current.iter().any(|s| s.id == old.id);
            if !still_listed && old.status.is_live() {
                notifications.push(PortForwardNotification::Closed {
                    session_id: old.id.clone(),
                    local_port: old.local_port,
                    target: old.target(),
                });
            }
        }

        if self.notifications_enabled {
            notifications
        } else {
            Vec::new()
        }
    }

    // =========================================================================
    // Lifecycle commands
    // =========================================================================

    /// Open a new port forward, then refresh the full list.
    ///
    /// Returns the session as created by the backend. Failures are recorded
    /// and returned so the caller can react to them.
    pub async fn start(&self, request: PortForwardRequest) -> Result<PortForwardSession> {
        self.clear_error();
        info!(
            context = %request.context,
            namespace = %request.namespace,
            resource_type = %request.resource_type,
            resource_name = %request.resource_name,
            local_port = request.local_port,
            remote_port = request.remote_port,
            "Starting port forward"
        );

        let args = json!({
            "context": request.context,
            "namespace": request.namespace,
            "resourceType": request.resource_type,
            "resourceName": request.resource_name,
            "localPort": request.local_port,
            "remotePort": request.remote_port,
        });

        match self
            .bridge
            .call::<PortForwardSession>("start_port_forward", args)
            .await
        {
            Ok(session) => {
                self.list().await;
                Ok(session)
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Stop one session, then refresh the full list.
    pub async fn stop(&self, id: &str) -> Result<()> {
        self.clear_error();
        info!(session_id = id, "Stopping port forward");
        match self.bridge.invoke("stop_port_forward", json!({ "id": id })).await {
            Ok(_) => {
                self.list().await;
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Stop every session, then refresh the full list.
    pub async fn stop_all(&self) -> Result<()> {
        self.clear_error();
        info!("Stopping all port forwards");
        match self.bridge.invoke("stop_all_port_forwards", Value::Null).await {
            Ok(_) => {
                self.list().await;
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Ports a resource exposes. Empty if discovery fails.
    pub async fn resolve_ports(
        &self,
        context: &str,
        namespace: &str,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Vec<AvailablePort> {
        let args = json!({
            "context": context,
            "namespace": namespace,
            "resourceType": resource_type,
            "resourceName": resource_name,
        });
        self.bridge
            .call::<Vec<AvailablePort>>("get_resource_ports", args)
            .await
            .unwrap_or_else(|e| {
                debug!(resource = resource_name, error = %e, "Port discovery failed");
                Vec::new()
            })
    }

    fn clear_error(&self) {
        self.state.write().error = None;
    }

    fn record(&self, error: Error) -> Error {
        warn!(error = %error, "Port forward command failed");
        self.state.write().error = Some(error.message());
        error
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Gets and clears pending notifications.
    pub fn take_notifications(&self) -> Vec<PortForwardNotification> {
        std::mem::take(&mut *self.pending_notifications.write())
    }

    /// Checks if there are pending notifications.
    pub fn has_pending_notifications(&self) -> bool {
        !self.pending_notifications.read().is_empty()
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Re-list sessions every `interval`.
    ///
    /// A tick that comes due while the previous listing is still running is
    /// skipped. Calling this while already polling does nothing.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let mut task = self.poll_task.lock();
        if task.as_ref().is_some_and(BackgroundTask::is_running) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        *task = Some(BackgroundTask::spawn(move |mut stop| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stop.stopped() => break,
                    _ = ticker.tick() => {}
                }
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.list().await;
            }
        }));
        debug!(?interval, "Port forward polling started");
    }

    /// Stop polling. A listing already in flight still completes.
    ///
    /// Safe to call when not polling.
    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().take() {
            task.stop();
            debug!("Port forward polling stopped");
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

    fn request(local_port: u16) -> PortForwardRequest {
        PortForwardRequest {
            context: "kind-dev".to_string(),
            namespace: "default".to_string(),
            resource_type: ResourceType::Service,
            resource_name: "web".to_string(),
            local_port,
            remote_port: 80,
        }
    }

    fn manager(backend: &Arc<InMemoryBackend>) -> Arc<PortForwardManager<InMemoryBackend>> {
        Arc::new(PortForwardManager::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_start_then_list_contains_session() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);

        let created = manager.start(request(8080)).await.unwrap();
        assert_eq!(created.status, PortForwardStatus::Starting);

        let sessions = manager.sessions();
        let session = sessions.iter().find(|s| s.local_port == 8080).unwrap();
        assert_eq!(session.id, created.id);
        assert!(matches!(
            session.status,
            PortForwardStatus::Starting | PortForwardStatus::Active
        ));
        assert_eq!(manager.active_count(), 1);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_stop_removes_session() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        let created = manager.start(request(8080)).await.unwrap();

        manager.stop(&created.id).await.unwrap();

        assert!(manager.find(&created.id).is_none());
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_all_on_empty_set() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);

        manager.stop_all().await.unwrap();

        assert!(manager.sessions().is_empty());
        assert_eq!(manager.error(), None);
    }

    #[tokio::test]
    async fn test_start_failure_is_recorded_and_returned() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        manager.start(request(8080)).await.unwrap();

        let err = manager.start(request(8080)).await.unwrap_err();

        assert_eq!(
            err.message(),
            "Port 8080 is already being forwarded by this app"
        );
        assert_eq!(
            manager.error().as_deref(),
            Some("Port 8080 is already being forwarded by this app")
        );
        assert_eq!(manager.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_unknown_session_is_returned() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);

        assert!(manager.stop("does-not-exist").await.is_err());
        assert!(manager.error().is_some());
    }

    #[tokio::test]
    async fn test_list_failure_keeps_previous_sessions() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        manager.start(request(8080)).await.unwrap();

        backend.fail_next("list_port_forwards", "backend busy");
        let sessions = manager.list().await;

        assert_eq!(sessions.len(), 1);
        assert_eq!(manager.error().as_deref(), Some("backend busy"));
    }

    #[tokio::test]
    async fn test_resolve_ports_empty_on_error() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);

        let ports = manager
            .resolve_ports("kind-dev", "default", ResourceType::Service, "web")
            .await;
        assert!(!ports.is_empty());

        let ports = manager
            .resolve_ports("kind-dev", "default", ResourceType::Service, "ghost")
            .await;
        assert!(ports.is_empty());
        assert_eq!(manager.error(), None);
    }

    #[tokio::test]
    async fn test_notifications_follow_lifecycle() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);

        let created = manager.start(request(9090)).await.unwrap();
        // first listing after start still reports starting
        assert!(manager.take_notifications().is_empty());

        manager.list().await;
        let notifications = manager.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type(), "connected");
        assert_eq!(notifications[0].session_id(), created.id);

        manager.stop(&created.id).await.unwrap();
        let notifications = manager.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type(), "closed");
        assert!(!manager.has_pending_notifications());
    }

    #[tokio::test]
    async fn test_failed_session_notifies() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        let created = manager.start(request(9091)).await.unwrap();

        backend.set_port_forward_status(&created.id, PortForwardStatus::Error);
        manager.list().await;

        let notifications = manager.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type(), "failed");
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_notifications_can_be_disabled() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager =
            Arc::new(PortForwardManager::new(backend.clone()).with_notifications(false));

        manager.start(request(8080)).await.unwrap();
        manager.list().await;

        assert!(!manager.has_pending_notifications());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_reconciles_and_is_idempotent() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        manager.start(request(8080)).await.unwrap();
        let before = backend.call_count("list_port_forwards");

        manager.start_polling(DEFAULT_POLL_INTERVAL);
        manager.start_polling(DEFAULT_POLL_INTERVAL);
        tokio::time::sleep(Duration::from_millis(4100)).await;

        assert_eq!(backend.call_count("list_port_forwards"), before + 2);
        assert_eq!(manager.sessions()[0].status, PortForwardStatus::Active);

        manager.stop_polling();
        manager.stop_polling();
        assert!(!manager.is_polling());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.call_count("list_port_forwards"), before + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_listing_skips_ticks() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        backend.script("list_port_forwards", Duration::from_secs(5), Ok(json!([])));

        manager.start_polling(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(5500)).await;

        // one slow listing in flight from t=1 to t=6; no overlapping calls
        assert_eq!(backend.call_count("list_port_forwards"), 1);
        assert!(manager.is_loading());
        manager.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_polling_lets_listing_in_flight_finish() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let manager = manager(&backend);
        backend.script("list_port_forwards", Duration::from_secs(5), Ok(json!([])));

        manager.start_polling(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(manager.is_loading());

        manager.stop_polling();
        assert!(!manager.is_polling());
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!manager.is_loading());
        assert_eq!(backend.call_count("list_port_forwards"), 1);

        manager.list().await;
        assert!(!manager.is_loading());
        assert_eq!(backend.call_count("list_port_forwards"), 2);
    }
}
