//! Startup diagnostics sequencer.
//!
//! Runs the five startup checks strictly in order. Each step's backend work
//! runs alongside a minimum display delay; the first failure stops the
//! sequence.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{CheckId, StartupCheck, StartupChecks};
use crate::error::{Error, Result};
use crate::ports::CommandBridge;

#[derive(Debug, Default)]
struct SequencerState {
    checks: StartupChecks,
    initialized: bool,
    init_error: Option<String>,
}

/// Runs the startup checks and tracks their progress.
pub struct StartupSequencer<B: CommandBridge> {
    bridge: Arc<B>,
    state: RwLock<SequencerState>,
    step_delay: Duration,
    settle_delay: Duration,
}

impl<B: CommandBridge> StartupSequencer<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self {
            bridge,
            state: RwLock::new(SequencerState::default()),
            step_delay: Duration::from_millis(400),
            settle_delay: Duration::from_millis(300),
        }
    }

    /// Set the minimum display time per step and the final pause.
    pub fn with_delays(mut self, step_delay: Duration, settle_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self.settle_delay = settle_delay;
        self
    }

    pub fn checks(&self) -> Vec<StartupCheck> {
        self.state.read().checks.checks().to_vec()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    pub fn init_error(&self) -> Option<String> {
        self.state.read().init_error.clone()
    }

    /// Percentage of checks that succeeded.
    pub fn progress(&self) -> u8 {
        self.state.read().checks.progress()
    }

    /// Label of the running check, or an empty string.
    pub fn current_check(&self) -> String {
        self.state.read().checks.current_label().to_string()
    }

    /// Return every check to pending so the sequence can run again.
    pub fn reset(&self) {
        *self.state.write() = SequencerState::default();
    }

    /// Run all checks. Returns whether the app is initialized.
    pub async fn run(&self) -> bool {
        match self.run_checks().await {
            Ok(()) => {
                tokio::time::sleep(self.settle_delay).await;
                self.state.write().initialized = true;
                info!("Startup checks passed");
                true
            }
            Err(e) => {
                let message = e.message();
                warn!(error = %message, "Startup checks failed");
                let mut state = self.state.write();
                state.checks.fail_running(&message);
                state.init_error = Some(message);
                false
            }
        }
    }

    async fn run_checks(&self) -> Result<()> {
        if !self.bridge.is_available() {
            return Err(Error::BridgeUnavailable(
                "no backend is running to serve commands".to_string(),
            ));
        }

        let config_path: String = self
            .step(CheckId::Kubeconfig, self.bridge.call("check_kubeconfig", Value::Null))
            .await?;
        self.succeed(CheckId::Kubeconfig, Some(config_path));

        self.step(
            CheckId::Parse,
            self.bridge.invoke("validate_kubeconfig", Value::Null),
        )
        .await?;
        self.succeed(CheckId::Parse, None);

        let contexts: Vec<String> = self
            .step(
                CheckId::Contexts,
                self.bridge.call("get_context_names", Value::Null),
            )
            .await?;
        self.succeed(
            CheckId::Contexts,
            Some(format!("{} contexts found", contexts.len())),
        );

        let current = self
            .step(CheckId::Connection, async {
                let current: String = self
                    .bridge
                    .call("get_current_context", Value::Null)
                    .await?;
                self.bridge
                    .invoke("test_cluster_connection", Value::Null)
                    .await?;
                Ok(current)
            })
            .await?;
        self.succeed(CheckId::Connection, Some(current));

        let namespaces: Vec<String> = self
            .step(
                CheckId::Namespaces,
                self.bridge.call("get_namespaces", Value::Null),
            )
            .await?;
        self.succeed(
            CheckId::Namespaces,
            Some(format!("{} namespaces", namespaces.len())),
        );

        Ok(())
    }

    /// Mark `id` running and await `work` together with the step delay.
    ///
    /// A failure of `work` returns immediately without waiting out the delay.
    async fn step<T, F>(&self, id: CheckId, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.state.write().checks.mark_running(id);
        debug!(check = id.label(), "Startup check running");

        let delay = async {
            tokio::time::sleep(self.step_delay).await;
            Ok::<(), Error>(())
        };
        let (value, ()) = tokio::try_join!(work, delay)?;
        Ok(value)
    }

    fn succeed(&self, id: CheckId, message: Option<String>) {
        self.state.write().checks.mark_success(id, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBackend;
    use crate::domain::CheckStatus;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_all_checks_pass() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        let sequencer = StartupSequencer::new(backend);

        let started = Instant::now();
        assert!(sequencer.run().await);

        // five steps plus the settle pause
        assert!(started.elapsed() >= Duration::from_millis(5 * 400 + 300));
        assert!(sequencer.is_initialized());
        assert_eq!(sequencer.progress(), 100);
        assert_eq!(sequencer.current_check(), "");

        let checks = sequencer.checks();
        assert_eq!(checks[2].message.as_deref(), Some("2 contexts found"));
        assert_eq!(checks[3].message.as_deref(), Some("kind-dev"));
        assert_eq!(checks[4].message.as_deref(), Some("3 namespaces"));
    }

    #[tokio::test]
    async fn test_context_failure_stops_sequence() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        backend.fail_next("get_context_names", "no contexts defined in kubeconfig");
        let sequencer = StartupSequencer::new(backend.clone())
            .with_delays(Duration::ZERO, Duration::ZERO);

        assert!(!sequencer.run().await);

        let checks = sequencer.checks();
        assert_eq!(checks[0].status, CheckStatus::Success);
        assert_eq!(checks[1].status, CheckStatus::Success);
        assert_eq!(checks[2].status, CheckStatus::Error);
        assert_eq!(
            checks[2].message.as_deref(),
            Some("no contexts defined in kubeconfig")
        );
        assert_eq!(checks[3].status, CheckStatus::Pending);
        assert_eq!(checks[4].status, CheckStatus::Pending);
        assert!(!sequencer.is_initialized());
        assert_eq!(
            sequencer.init_error().as_deref(),
            Some("no contexts defined in kubeconfig")
        );
        assert_eq!(backend.call_count("test_cluster_connection"), 0);
        assert_eq!(sequencer.progress(), 40);
    }

    #[tokio::test]
    async fn test_unavailable_bridge_leaves_checks_pending() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        backend.set_available(false);
        let sequencer = StartupSequencer::new(backend.clone())
            .with_delays(Duration::ZERO, Duration::ZERO);

        assert!(!sequencer.run().await);

        assert!(sequencer
            .checks()
            .iter()
            .all(|c| c.status == CheckStatus::Pending));
        assert!(sequencer.init_error().is_some());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_allows_rerun() {
        let backend = Arc::new(InMemoryBackend::with_sample_cluster());
        backend.fail_next("validate_kubeconfig", "invalid yaml");
        let sequencer = StartupSequencer::new(backend.clone())
            .with_delays(Duration::ZERO, Duration::ZERO);

        assert!(!sequencer.run().await);
        sequencer.reset();
        assert_eq!(sequencer.progress(), 0);
        assert_eq!(sequencer.init_error(), None);

        assert!(sequencer.run().await);
        assert!(sequencer.is_initialized());
    }
}
