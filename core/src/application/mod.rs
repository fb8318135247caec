//! Application layer - Stores.
//!
//! Each store owns one concern of the session state and talks to the
//! backend only through the [`CommandBridge`](crate::ports::CommandBridge)
//! port:
//! - `ContextSelector`: active context, namespace filter, refresh signal
//! - `ResourceMirror`: per-kind mirrored collections and mutations
//! - `PortForwardManager`: port-forward sessions and reconciliation
//! - `StartupSequencer`: ordered startup diagnostics
//!
//! Stores catch backend failures, record them in their error slot and
//! return a safe default. Port-forward commands also return the error.

mod mirror;
mod portforward;
mod selector;
mod startup;
mod task;

pub use mirror::{Mirror, MirrorSet, MirrorStatus, Mirrored, PodsByStatus, ResourceMirror};
pub use portforward::{PortForwardManager, DEFAULT_POLL_INTERVAL};
pub use selector::{ConnectionStatus, ContextSelector};
pub use startup::StartupSequencer;
pub(crate) use task::BackgroundTask;
