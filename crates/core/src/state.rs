//! Immutable snapshots of the full allocation state.

use serde::{Deserialize, Serialize};

use crate::{ResourceAllocationGraph, SafetyState, Units};

/// A deep copy of the allocation state at one point in time.
///
/// Snapshots are fully independent values: they share nothing with
/// the live state they were captured from and are owned exclusively
/// by the engine's history list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    safety: SafetyState,
    graph: ResourceAllocationGraph,
}

impl SystemState {
    /// Capture the given live state.
    pub fn capture(safety: &SafetyState, graph: &ResourceAllocationGraph) -> Self {
        Self {
            safety: safety.clone(),
            graph: graph.clone(),
        }
    }

    /// The captured safety state.
    pub fn safety(&self) -> &SafetyState {
        &self.safety
    }

    /// The captured resource-allocation graph.
    pub fn graph(&self) -> &ResourceAllocationGraph {
        &self.graph
    }

    /// Allocation matrix at capture time.
    pub fn allocation(&self) -> &[Vec<Units>] {
        self.safety.allocation()
    }

    /// Max matrix at capture time.
    pub fn max(&self) -> &[Vec<Units>] {
        self.safety.max()
    }

    /// Need matrix at capture time.
    pub fn need(&self) -> &[Vec<Units>] {
        self.safety.need()
    }

    /// Available vector at capture time.
    pub fn available(&self) -> &[Units] {
        self.safety.available()
    }

    /// Rebuild a live state pair from this snapshot.
    pub fn restore(&self) -> (SafetyState, ResourceAllocationGraph) {
        (self.safety.clone(), self.graph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_is_independent_of_live_state() {
        let mut safety = SafetyState::new(2, 2, vec![4, 4]).unwrap();
        safety.set_max_demand(0, &[2, 2]).unwrap();
        let mut graph = ResourceAllocationGraph::new(2, 2);

        let snapshot = SystemState::capture(&safety, &graph);

        safety.allocate(0, 0, 2).unwrap();
        graph.add_allocation(0, 0, 2);

        assert_eq!(snapshot.allocation()[0][0], 0);
        assert_eq!(snapshot.available()[0], 4);
        assert_eq!(snapshot.graph().allocation_edges()[0][0], 0);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let safety = SafetyState::new(2, 2, vec![1, 1]).unwrap();
        let graph = ResourceAllocationGraph::new(2, 2);
        let snapshot = SystemState::capture(&safety, &graph);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SystemState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.available(), snapshot.available());
        assert_eq!(back.allocation(), snapshot.allocation());
    }
}
