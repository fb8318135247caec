//! Port-forward session models mirrored from the backend.

use serde::{Deserialize, Serialize};

// ============================================================================
// Resource Type
// ============================================================================

/// Kind of resource a port forward targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pod,
    Service,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Service => "service",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pod" | "po" | "pods" => Ok(Self::Pod),
            "service" | "svc" | "services" => Ok(Self::Service),
            other => Err(format!("unknown resource type '{}'", other)),
        }
    }
}

// ============================================================================
// Port Forward Status
// ============================================================================

/// Status of a port-forward session as reported by the backend.
///
/// ```text
/// starting -> active -> error
///     \--------------> error
/// any ---------------> stopped (explicit stop)
/// ```
///
/// `error` and `stopped` are terminal: a failed session is stopped and a
/// new one started, never revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortForwardStatus {
    Starting,
    Active,
    Error,
    Stopped,
}

impl PortForwardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    /// Whether the session counts towards the active badge.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Stopped)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: PortForwardStatus) -> bool {
        if *self == next {
            return true;
        }
        match (self, next) {
            (_, Self::Stopped) => true,
            (Self::Starting, Self::Active) => true,
            (Self::Starting, Self::Error) => true,
            (Self::Active, Self::Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PortForwardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// A port-forward session as mirrored from the backend.
///
/// The backend is the authority on every field; the manager only ever
/// replaces the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForwardSession {
    pub id: String,
    pub context: String,
    pub namespace: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    /// Resolved backing pod (same as `resource_name` for pods).
    pub pod_name: String,
    pub local_port: u16,
    pub remote_port: u16,
    pub status: PortForwardStatus,
    #[serde(default)]
    pub active_connections: u64,
    #[serde(default)]
    pub total_connections: u64,
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_received: u64,
}

impl PortForwardSession {
    /// Short target label, e.g. "svc/web" or "pod/web-0".
    pub fn target(&self) -> String {
        match self.resource_type {
            ResourceType::Pod => format!("pod/{}", self.resource_name),
            ResourceType::Service => format!("svc/{}", self.resource_name),
        }
    }

    /// Local address clients connect to.
    pub fn local_address(&self) -> String {
        format!("127.0.0.1:{}", self.local_port)
    }
}

/// Request to open a new port forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortForwardRequest {
    pub context: String,
    pub namespace: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub local_port: u16,
    pub remote_port: u16,
}

/// A port a resource exposes, as discovered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailablePort {
    pub port: u16,
    pub name: Option<String>,
    pub protocol: String,
}

impl AvailablePort {
    /// Returns a display name for the port (e.g., "8080 (http)").
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("{} ({})", self.port, name),
            _ => self.port.to_string(),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Status changes observed while reconciling with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortForwardNotification {
    Connected {
        session_id: String,
        local_port: u16,
        target: String,
    },
    Failed {
        session_id: String,
        local_port: u16,
        target: String,
    },
    Closed {
        session_id: String,
        local_port: u16,
        target: String,
    },
}

impl PortForwardNotification {
    pub fn notification_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Failed { .. } => "failed",
            Self::Closed { .. } => "closed",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Connected { session_id, .. }
            | Self::Failed { session_id, .. }
            | Self::Closed { session_id, .. } => session_id,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Connected {
                local_port, target, ..
            } => format!("Forwarding localhost:{} -> {}", local_port, target),
            Self::Failed {
                local_port, target, ..
            } => format!("Port forward localhost:{} -> {} failed", local_port, target),
            Self::Closed {
                local_port, target, ..
            } => format!("Port forward localhost:{} -> {} closed", local_port, target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use PortForwardStatus::*;

        assert!(Starting.can_transition_to(Active));
        assert!(Starting.can_transition_to(Error));
        assert!(Active.can_transition_to(Error));
        assert!(Active.can_transition_to(Stopped));
        assert!(Error.can_transition_to(Stopped));

        assert!(!Error.can_transition_to(Active));
        assert!(!Active.can_transition_to(Starting));
        assert!(!Stopped.can_transition_to(Active));
        assert!(Active.can_transition_to(Active));
    }

    #[test]
    fn test_status_wire_format() {
        let status: PortForwardStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(status, PortForwardStatus::Active);
        assert!(status.is_live());
        assert!(PortForwardStatus::Error.is_terminal());
    }

    #[test]
    fn test_session_deserializes_backend_payload() {
        let payload = serde_json::json!({
            "id": "2b1c",
            "context": "kind-dev",
            "namespace": "default",
            "resource_type": "service",
            "resource_name": "web",
            "pod_name": "web-7d9f-abcde",
            "local_port": 8080,
            "remote_port": 80,
            "status": "starting",
            "active_connections": 0,
            "total_connections": 3,
            "bytes_sent": 1024,
            "bytes_received": 4096
        });

        let session: PortForwardSession = serde_json::from_value(payload).unwrap();
        assert_eq!(session.resource_type, ResourceType::Service);
        assert_eq!(session.target(), "svc/web");
        assert_eq!(session.local_address(), "127.0.0.1:8080");
        assert_eq!(session.total_connections, 3);
    }

    #[test]
    fn test_available_port_display_name() {
        let named = AvailablePort {
            port: 8080,
            name: Some("http".to_string()),
            protocol: "TCP".to_string(),
        };
        assert_eq!(named.display_name(), "8080 (http)");

        let unnamed = AvailablePort {
            port: 3000,
            name: None,
            protocol: "TCP".to_string(),
        };
        assert_eq!(unnamed.display_name(), "3000");
    }

    #[test]
    fn test_resource_type_parsing() {
        assert_eq!("svc".parse::<ResourceType>(), Ok(ResourceType::Service));
        assert_eq!("Pod".parse::<ResourceType>(), Ok(ResourceType::Pod));
        assert!("deployment".parse::<ResourceType>().is_err());
    }
}
