//! Error types for the kubedesk-core library.

use thiserror::Error;

/// Result type alias for kubedesk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the native backend or managing state.
#[derive(Error, Debug)]
pub enum Error {
    /// The host runtime that serves commands is not present (or has gone away).
    #[error("Backend bridge unavailable: {0}")]
    BridgeUnavailable(String),

    /// The backend rejected the command or the target operation failed.
    #[error("{0}")]
    Backend(String),

    /// No cluster context is selected yet.
    #[error("No cluster context selected")]
    NotReady,

    /// The backend answered with a payload of an unexpected shape.
    #[error("Failed to decode response to `{command}`: {message}")]
    Decode { command: String, message: String },

    /// The transport stopped waiting for a response.
    #[error("Command `{command}` timed out")]
    Timeout { command: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this error should block the UI rather than be shown inline.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::BridgeUnavailable(_))
    }

    /// Human-readable message suitable for an error slot.
    ///
    /// Backend messages are passed through untouched.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bridge_unavailable_is_fatal() {
        assert!(Error::BridgeUnavailable("gone".into()).is_fatal());
        assert!(!Error::Backend("nope".into()).is_fatal());
        assert!(!Error::NotReady.is_fatal());
        assert!(!Error::Timeout {
            command: "get_pods".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_backend_message_is_passed_through() {
        let err = Error::Backend("Port 8080 is already being forwarded by this app".into());
        assert_eq!(
            err.message(),
            "Port 8080 is already being forwarded by this app"
        );
    }
}
