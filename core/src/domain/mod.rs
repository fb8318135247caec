//! Domain layer - Pure models and derived computations.
//!
//! This module contains the snapshot types mirrored from the backend and the
//! pure functions derived from them (search, startup progress, navigation).
//! These types have no I/O dependencies and can be tested in isolation.

mod navigation;
mod portforward;
mod resources;
mod search;
mod startup;

// Re-export all domain types
pub use navigation::{NavigationState, View};
pub use portforward::{
    AvailablePort, PortForwardNotification, PortForwardRequest, PortForwardSession,
    PortForwardStatus, ResourceType,
};
pub use resources::*;
pub use search::{
    filter_by_search, filter_resources, is_blank, FieldValue, SearchResults, Searchable,
};
pub use startup::{CheckId, CheckStatus, StartupCheck, StartupChecks};
