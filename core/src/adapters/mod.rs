//! Adapters layer - Command bridge implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter carries commands to one kind of host runtime.

pub mod memory;
pub mod stdio;

// Re-export main types for convenience
pub use memory::{InMemoryBackend, RecordedCall};
pub use stdio::StdioBridge;
