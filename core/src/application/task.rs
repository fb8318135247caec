//! Background loops that stop between iterations.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Resolves once the owning [`BackgroundTask`] is stopped or dropped.
pub(crate) struct StopSignal(watch::Receiver<bool>);

impl StopSignal {
    pub(crate) async fn stopped(&mut self) {
        // An error means the sender is gone, which also means stop.
        let _ = self.0.changed().await;
    }
}

/// A spawned loop that is asked to stop instead of being aborted.
///
/// The loop body checks its [`StopSignal`] only while waiting, so a bridge
/// call already in flight runs to completion and its bookkeeping is kept.
pub(crate) struct BackgroundTask {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl BackgroundTask {
    pub(crate) fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(body(StopSignal(stop_rx)));
        Self { handle, stop_tx }
    }

    /// Ask the loop to exit at its next wait point.
    pub(crate) fn stop(self) {
        self.stop_tx.send_replace(true);
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
