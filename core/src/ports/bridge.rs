//! Command bridge port (interface).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Port for invoking commands on the native backend.
///
/// This trait defines the single gateway every store goes through.
/// Implementations carry the command to whatever host runtime serves it
/// (a child process, an in-process simulation, ...). No retries happen at
/// this layer; callers decide.
pub trait CommandBridge: Send + Sync {
    /// Invoke a named command with a mapping of named arguments.
    ///
    /// `args` is a JSON object (or `Value::Null` for no arguments).
    /// Fails with `Error::BridgeUnavailable` if no host runtime is present,
    /// or `Error::Backend` if the backend rejects the call.
    fn invoke(
        &self,
        command: &str,
        args: Value,
    ) -> impl std::future::Future<Output = Result<Value>> + Send;

    /// Whether a host runtime capable of serving commands is present.
    fn is_available(&self) -> bool {
        true
    }

    /// Invoke a command and decode its payload.
    fn call<T>(
        &self,
        command: &str,
        args: Value,
    ) -> impl std::future::Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let value = self.invoke(command, args).await?;
            serde_json::from_value(value).map_err(|e| Error::Decode {
                command: command.to_string(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Answers every command with a fixed payload.
    struct FixedBridge(Value);

    impl CommandBridge for FixedBridge {
        async fn invoke(&self, _command: &str, _args: Value) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_call_decodes_payload() {
        let bridge = FixedBridge(json!(["default", "kube-system"]));
        let namespaces: Vec<String> =
            tokio_test::block_on(bridge.call("get_namespaces", Value::Null)).unwrap();
        assert_eq!(namespaces, vec!["default", "kube-system"]);
        assert!(bridge.is_available());
    }

    #[test]
    fn test_call_reports_decode_failure() {
        let bridge = FixedBridge(json!({ "unexpected": true }));
        let err = tokio_test::block_on(bridge.call::<Vec<String>>("get_namespaces", Value::Null))
            .unwrap_err();
        match err {
            Error::Decode { command, .. } => assert_eq!(command, "get_namespaces"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
