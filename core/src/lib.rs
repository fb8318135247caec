//! KubeDesk Core Library
//!
//! State layer for a desktop Kubernetes manager. All cluster access goes
//! through a single request/response command bridge; this library mirrors
//! what the backend reports and keeps it fresh.
//! Provides functionality to:
//! - Track contexts, namespaces and external context switches
//! - Mirror eighteen resource kinds and run pod/statefulset mutations
//! - Manage port-forward sessions with status-change notifications
//! - Search across every mirrored collection
//! - Run the ordered startup diagnostics
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models and derived computations
//! - `ports`: Trait definitions (the command bridge)
//! - `adapters`: Bridge implementations (child process, in-memory cluster)
//! - `application`: Stores built on the bridge
//! - `engine`: One session wiring the stores together

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod engine;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    KubeContext, NavigationState, PodInfo, PortForwardNotification, PortForwardRequest,
    PortForwardSession, PortForwardStatus, PulseMetrics, ResourceKind, ResourceType,
    SearchResults, View,
};

// Re-export other commonly used types
pub use adapters::{InMemoryBackend, StdioBridge};
pub use application::{ContextSelector, PortForwardManager, ResourceMirror, StartupSequencer};
pub use config::{Config, ConfigStore};
pub use engine::Engine;
pub use error::{Error, Result};
pub use ports::CommandBridge;
