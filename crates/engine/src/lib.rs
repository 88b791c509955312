//! dlsim allocation engine.
//!
//! Orchestrates the request/release workflow over one live
//! `(ResourceAllocationGraph, SafetyState)` pair: Banker-checked
//! grants, cycle-based deadlock detection, single-victim recovery,
//! a navigable snapshot history and synchronous deadlock listeners.

#![warn(missing_docs)]

mod engine;
mod recovery;
mod tracker;

pub use engine::{AllocationEngine, DeadlockListener, ListenerId};
pub use tracker::PerformanceTracker;

/// Strategy label recorded when recovery terminates a victim.
pub const PROCESS_TERMINATION: &str = "Process Termination";

/// Strategy label recorded when the Banker check denies a request.
pub const BANKERS_ALGORITHM: &str = "Banker's Algorithm";
