//! dlsim core data models.
//!
//! This crate defines the allocation-state primitives that power the
//! deadlock simulation toolkit: the resource-allocation graph, the
//! Banker's-algorithm safety state, immutable system snapshots and
//! deadlock lifecycle events.

#![warn(missing_docs)]

mod error;

// Allocation state
mod banker;
mod rag;

// Snapshots and events
mod event;
mod state;

// Re-exports
pub use error::{CoreError, Result};

pub use banker::SafetyState;
pub use rag::ResourceAllocationGraph;

pub use event::DeadlockEvent;
pub use state::SystemState;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Unit count held, requested or available for a resource class.
pub type Units = u32;
