//! In-memory deadlock statistics and event log.
//!
//! Aggregation and long-term persistence are collaborator concerns;
//! this tracker only keeps the counters and the owned event log the
//! engine needs to answer queries and label resolutions.

use std::collections::HashMap;

use dlsim_core::DeadlockEvent;

/// Counters and event log for one engine instance.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    total_deadlocks: u32,
    resolved_deadlocks: u32,
    prevented_deadlocks: u32,
    strategy_counts: HashMap<String, u32>,
    events: Vec<DeadlockEvent>,
    total_resolution_ms: i64,
    status: String,
}

impl PerformanceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            status: "System initialized".to_string(),
            ..Self::default()
        }
    }

    /// Drop all counters and events.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a detection and return a copy of the new event.
    pub fn record_detection(&mut self, processes: Vec<usize>) -> DeadlockEvent {
        self.total_deadlocks += 1;
        let event = DeadlockEvent::new(processes);
        self.status = format!(
            "Deadlock detected involving {} processes",
            event.processes.len()
        );
        self.events.push(event.clone());
        event
    }

    /// Mark the most recent unresolved event resolved with the given
    /// strategy label. Returns the updated event, or `None` if every
    /// recorded deadlock is already resolved.
    pub fn record_resolution(&mut self, strategy: &str) -> Option<DeadlockEvent> {
        let event = self.events.iter_mut().rev().find(|e| !e.resolved)?;
        event.mark_resolved(strategy);

        self.resolved_deadlocks += 1;
        self.total_resolution_ms += event.resolution_duration_ms.unwrap_or(0);
        *self.strategy_counts.entry(strategy.to_string()).or_insert(0) += 1;
        self.status = format!("Deadlock resolved using {strategy}");

        Some(event.clone())
    }

    /// Record a denial that kept the system out of an unsafe state.
    pub fn record_prevention(&mut self, strategy: &str) {
        self.prevented_deadlocks += 1;
        *self.strategy_counts.entry(strategy.to_string()).or_insert(0) += 1;
        self.status = format!("Deadlock prevented using {strategy}");
    }

    /// Overwrite the status line.
    pub fn update_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Total deadlocks detected since the last reset.
    pub fn total_deadlocks(&self) -> u32 {
        self.total_deadlocks
    }

    /// Deadlocks resolved since the last reset.
    pub fn resolved_deadlocks(&self) -> u32 {
        self.resolved_deadlocks
    }

    /// Requests denied by the Banker check since the last reset.
    pub fn prevented_deadlocks(&self) -> u32 {
        self.prevented_deadlocks
    }

    /// Per-strategy resolution/prevention counts.
    pub fn strategy_counts(&self) -> &HashMap<String, u32> {
        &self.strategy_counts
    }

    /// Every recorded deadlock event, oldest first.
    pub fn events(&self) -> &[DeadlockEvent] {
        &self.events
    }

    /// Mean detection-to-resolution latency in milliseconds.
    pub fn average_resolution_ms(&self) -> f64 {
        if self.resolved_deadlocks == 0 {
            return 0.0;
        }
        self.total_resolution_ms as f64 / self.resolved_deadlocks as f64
    }

    /// Last status line.
    pub fn status(&self) -> &str {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_empty() {
        let tracker = PerformanceTracker::new();
        assert_eq!(tracker.total_deadlocks(), 0);
        assert_eq!(tracker.average_resolution_ms(), 0.0);
        assert_eq!(tracker.status(), "System initialized");
    }

    #[test]
    fn test_detection_then_resolution() {
        let mut tracker = PerformanceTracker::new();
        tracker.record_detection(vec![0, 1]);
        assert_eq!(tracker.total_deadlocks(), 1);
        assert!(tracker.status().contains("2 processes"));

        let resolved = tracker.record_resolution("Process Termination").unwrap();
        assert!(resolved.resolved);
        assert_eq!(tracker.resolved_deadlocks(), 1);
        assert_eq!(tracker.strategy_counts()["Process Termination"], 1);
    }

    #[test]
    fn test_resolution_without_detection_is_none() {
        let mut tracker = PerformanceTracker::new();
        assert!(tracker.record_resolution("Process Termination").is_none());
    }

    #[test]
    fn test_resolution_targets_latest_unresolved() {
        let mut tracker = PerformanceTracker::new();
        tracker.record_detection(vec![0]);
        tracker.record_detection(vec![1]);

        let resolved = tracker.record_resolution("Process Termination").unwrap();
        assert_eq!(resolved.processes, vec![1]);
        assert!(!tracker.events()[0].resolved);
        assert!(tracker.events()[1].resolved);
    }

    #[test]
    fn test_prevention_counter() {
        let mut tracker = PerformanceTracker::new();
        tracker.record_prevention("Banker's Algorithm");
        tracker.record_prevention("Banker's Algorithm");
        assert_eq!(tracker.prevented_deadlocks(), 2);
        assert_eq!(tracker.strategy_counts()["Banker's Algorithm"], 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut tracker = PerformanceTracker::new();
        tracker.record_detection(vec![0]);
        tracker.record_resolution("Process Termination");
        tracker.reset();

        assert_eq!(tracker.total_deadlocks(), 0);
        assert!(tracker.events().is_empty());
    }
}
