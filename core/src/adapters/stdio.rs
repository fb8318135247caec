//! Command bridge over a child process speaking newline-delimited JSON.
//!
//! Request:  `{"id":N,"command":"get_pods","args":{"namespace":"default"}}`
//! Response: `{"id":N,"result":...}` or `{"id":N,"error":"message"}`
//!
//! Requests are multiplexed by id. A reader task routes each response to
//! its waiter; when the child's stdout closes every waiter fails with
//! `BridgeUnavailable` and the bridge stays unavailable.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ports::CommandBridge;

type Waiters = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// Default time to wait for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bridge to a backend helper process.
pub struct StdioBridge {
    stdin: AsyncMutex<ChildStdin>,
    child: AsyncMutex<Child>,
    pending: Waiters,
    next_request_id: AtomicU64,
    alive: Arc<AtomicBool>,
    timeout: Duration,
}

impl StdioBridge {
    /// Launch `program` with `args` and start routing its responses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(program: &str, args: &[String], timeout: Duration) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::BridgeUnavailable(format!("failed to launch backend '{}': {}", program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::BridgeUnavailable("backend stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::BridgeUnavailable("backend stdout unavailable".to_string()))?;

        let pending: Waiters = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        tokio::spawn(run_reader_loop(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));
        debug!(program = program, "Backend process started");

        Ok(Self {
            stdin: AsyncMutex::new(stdin),
            child: AsyncMutex::new(child),
            pending,
            next_request_id: AtomicU64::new(1),
            alive,
            timeout,
        })
    }

    /// Kill the backend process and wait for it to exit.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        let _ = child.wait().await;
        self.alive.store(false, Ordering::SeqCst);
    }

    async fn send_line(&self, line: &str) -> std::io::Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    }
}

impl CommandBridge for StdioBridge {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value> {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            // Checked under the lock so a closing reader cannot miss this waiter.
            if !self.alive.load(Ordering::SeqCst) {
                return Err(Error::BridgeUnavailable(
                    "backend process has exited".to_string(),
                ));
            }
            pending.insert(id, tx);
        }

        let args = if args.is_null() { json!({}) } else { args };
        let message = json!({ "id": id, "command": command, "args": args });
        let line = serde_json::to_string(&message)?;
        debug!(id = id, command = command, "Sending command");

        if let Err(e) = self.send_line(&line).await {
            self.pending.lock().remove(&id);
            return Err(Error::BridgeUnavailable(format!(
                "failed to write to backend: {}",
                e
            )));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::BridgeUnavailable(
                "backend response channel closed".to_string(),
            )),
            Err(_) => {
                self.pending.lock().remove(&id);
                warn!(id = id, command = command, "Command timed out");
                Err(Error::Timeout {
                    command: command.to_string(),
                })
            }
        }
    }

    fn is_available(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

async fn run_reader_loop(stdout: ChildStdout, pending: Waiters, alive: Arc<AtomicBool>) {
    let mut reader = BufReader::new(stdout).lines();
    let reason = loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break "backend process ended".to_string(),
            Err(e) => break format!("failed to read backend output: {}", e),
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match serde_json::from_str::<Value>(&line) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed backend line");
                continue;
            }
        };
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            continue;
        };

        let waiter = pending.lock().remove(&id);
        if let Some(waiter) = waiter {
            let _ = waiter.send(parse_response(&message));
        } else {
            debug!(id = id, "Response for unknown or abandoned request");
        }
    };

    warn!(reason = %reason, "Backend bridge closed");
    alive.store(false, Ordering::SeqCst);
    let waiters: Vec<_> = pending.lock().drain().map(|(_, sender)| sender).collect();
    for waiter in waiters {
        let _ = waiter.send(Err(Error::BridgeUnavailable(reason.clone())));
    }
}

/// Turn one response object into the command's outcome.
fn parse_response(message: &Value) -> Result<Value> {
    match message.get("error") {
        Some(Value::String(error)) => Err(Error::Backend(error.clone())),
        Some(Value::Null) | None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
        Some(other) => Err(Error::Backend(
            other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        assert_eq!(
            parse_response(&json!({ "id": 1, "result": ["a"] })).unwrap(),
            json!(["a"])
        );
        assert_eq!(
            parse_response(&json!({ "id": 2, "result": null })).unwrap(),
            Value::Null
        );
        let err = parse_response(&json!({ "id": 3, "error": "pods \"x\" not found" })).unwrap_err();
        assert_eq!(err.message(), "pods \"x\" not found");
        let err = parse_response(&json!({ "id": 4, "error": { "message": "denied" } })).unwrap_err();
        assert_eq!(err.message(), "denied");
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let result = StdioBridge::spawn("kubedesk-no-such-backend", &[], DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(Error::BridgeUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_round_trip_through_child() {
        // Echo the request id back with a fixed result.
        let script = r#"while read -r line; do
            id=$(printf '%s' "$line" | sed -E 's/.*"id":([0-9]+).*/\1/')
            printf '{"id":%s,"result":"kind-dev"}\n' "$id"
        done"#;
        let bridge =
            StdioBridge::spawn("sh", &["-c".to_string(), script.to_string()], DEFAULT_TIMEOUT)
                .unwrap();

        let current: String = bridge
            .call("get_current_context", Value::Null)
            .await
            .unwrap();
        assert_eq!(current, "kind-dev");
        assert!(bridge.is_available());

        bridge.shutdown().await;
        assert!(!bridge.is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_exit_fails_waiters() {
        let bridge = StdioBridge::spawn(
            "sh",
            &["-c".to_string(), "read -r line; exit 0".to_string()],
            DEFAULT_TIMEOUT,
        )
        .unwrap();

        let err = bridge.invoke("get_pods", Value::Null).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(!bridge.is_available());
    }
}
