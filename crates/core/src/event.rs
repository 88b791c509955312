//! Deadlock lifecycle events.

use serde::{Deserialize, Serialize};

use crate::Time;

/// One detected deadlock, from detection to (optional) resolution.
///
/// Created when a wait-for cycle is found, mutated exactly once when
/// the deadlock is resolved, immutable otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockEvent {
    /// Processes involved in the cycle, first-discovered order
    pub processes: Vec<usize>,

    /// When the cycle was detected
    pub detected_at: Time,

    /// Whether this deadlock has been resolved
    pub resolved: bool,

    /// Strategy label used to resolve it, if resolved
    pub resolution_strategy: Option<String>,

    /// When it was resolved
    pub resolved_at: Option<Time>,

    /// Detection-to-resolution latency in milliseconds
    pub resolution_duration_ms: Option<i64>,
}

impl DeadlockEvent {
    /// Create an unresolved event for the given process set.
    pub fn new(processes: Vec<usize>) -> Self {
        Self {
            processes,
            detected_at: chrono::Utc::now(),
            resolved: false,
            resolution_strategy: None,
            resolved_at: None,
            resolution_duration_ms: None,
        }
    }

    /// Mark this event resolved with the given strategy label.
    pub fn mark_resolved(&mut self, strategy: impl Into<String>) {
        let now = chrono::Utc::now();
        self.resolved = true;
        self.resolution_strategy = Some(strategy.into());
        self.resolved_at = Some(now);
        self.resolution_duration_ms = Some((now - self.detected_at).num_milliseconds());
    }
}
