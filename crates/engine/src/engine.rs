//! The allocation engine: request/release workflow, deadlock
//! lifecycle, snapshot history and listener notification.

use tracing::{debug, info, warn};

use dlsim_core::{
    DeadlockEvent, ResourceAllocationGraph, Result, SafetyState, SystemState, Units,
};
use dlsim_prevention::PreventionStrategy;

use crate::{recovery, PerformanceTracker, BANKERS_ALGORITHM, PROCESS_TERMINATION};

/// Callbacks for deadlock lifecycle events.
///
/// Listeners run synchronously on the calling thread, in registration
/// order, inside the engine operation that triggered them. A listener
/// must not re-enter the engine.
pub trait DeadlockListener {
    /// A wait-for cycle was detected.
    fn on_deadlock_detected(&mut self, processes: &[usize], event: &DeadlockEvent);

    /// A deadlock was resolved with the given strategy.
    fn on_deadlock_resolved(&mut self, processes: &[usize], strategy: &str);
}

/// Handle returned by [`AllocationEngine::add_deadlock_listener`],
/// used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Orchestrator over one live allocation state.
///
/// Owns the safety state, the resource-allocation graph, a linear
/// snapshot history with a cursor, the registered listeners and the
/// performance tracker. Single-threaded by design: every operation
/// runs to completion before returning.
pub struct AllocationEngine {
    safety: SafetyState,
    rag: ResourceAllocationGraph,
    history: Vec<SystemState>,
    cursor: usize,
    listeners: Vec<(ListenerId, Box<dyn DeadlockListener>)>,
    next_listener_id: u64,
    tracker: PerformanceTracker,
}

impl AllocationEngine {
    /// Create an engine for the given dimensions and initial pool.
    pub fn new(num_processes: usize, num_resources: usize, available: Vec<Units>) -> Result<Self> {
        let safety = SafetyState::new(num_processes, num_resources, available)?;
        let rag = ResourceAllocationGraph::new(num_processes, num_resources);
        let initial = SystemState::capture(&safety, &rag);

        Ok(Self {
            safety,
            rag,
            history: vec![initial],
            cursor: 0,
            listeners: Vec::new(),
            next_listener_id: 0,
            tracker: PerformanceTracker::new(),
        })
    }

    /// Reset to a fresh state, clearing history and statistics.
    ///
    /// Registered listeners survive re-initialization.
    pub fn initialize(
        &mut self,
        num_processes: usize,
        num_resources: usize,
        available: Vec<Units>,
    ) -> Result<()> {
        self.safety = SafetyState::new(num_processes, num_resources, available)?;
        self.rag = ResourceAllocationGraph::new(num_processes, num_resources);
        self.history.clear();
        self.tracker.reset();
        self.history.push(SystemState::capture(&self.safety, &self.rag));
        self.cursor = 0;

        debug!(num_processes, num_resources, "engine initialized");
        Ok(())
    }

    /// Request `units` of resource `r` for process `p`.
    ///
    /// Returns `Ok(false)` without mutating anything when the Banker
    /// check finds the resulting state unsafe. On a grant the
    /// allocation is committed, the satisfied request is recorded as a
    /// graph request edge, and deadlock detection runs
    /// unconditionally: leftover request edges from other processes
    /// can close a cycle the moment this grant lands.
    pub fn request_resource(&mut self, p: usize, r: usize, units: Units) -> Result<bool> {
        if !self.safety.is_request_safe(p, r, units)? {
            info!(process = p, resource = r, units, "request denied: would lead to unsafe state");
            self.tracker.record_prevention(BANKERS_ALGORITHM);
            self.tracker
                .update_status("Request denied: would lead to unsafe state");
            return Ok(false);
        }

        self.safety.allocate(p, r, units)?;
        self.rag.add_request(p, r, units);
        info!(process = p, resource = r, units, "request granted");

        if self.rag.detect_deadlock() {
            warn!(process = p, resource = r, "deadlock detected after allocation");
            self.raise_detection();
        } else {
            self.tracker.update_status("Resource allocated successfully");
        }

        self.record_state();
        Ok(true)
    }

    /// Return `units` of resource `r` from process `p` to the pool.
    pub fn release_resource(&mut self, p: usize, r: usize, units: Units) -> Result<()> {
        self.safety.release(p, r, units)?;
        self.rag.remove_allocation(p, r, units);

        debug!(process = p, resource = r, units, "resources released");
        self.tracker.update_status("Resource released successfully");
        self.record_state();
        Ok(())
    }

    /// Check the graph for a wait-for cycle.
    ///
    /// Raises a fresh detection event on every positive call; while a
    /// deadlock persists, repeated checks re-raise. Deduplication is a
    /// collaborator policy, not done here.
    pub fn detect_deadlock(&mut self) -> bool {
        let deadlocked = self.rag.detect_deadlock();
        if deadlocked {
            warn!("deadlock detected");
            self.raise_detection();
        }
        deadlocked
    }

    /// Processes currently on a wait-for cycle.
    pub fn deadlocked_processes(&self) -> Vec<usize> {
        self.rag.deadlocked_processes()
    }

    /// Break the current deadlock by terminating one victim.
    ///
    /// No-op returning `Ok(None)` when nothing is deadlocked. One
    /// victim per call: the caller loops if the remaining cycle needs
    /// further terminations.
    pub fn resolve_deadlock(&mut self) -> Result<Option<usize>> {
        let deadlocked = self.rag.deadlocked_processes();
        if deadlocked.is_empty() {
            return Ok(None);
        }

        let victim = recovery::resolve_deadlock(&deadlocked, &mut self.safety, &mut self.rag)?;
        self.tracker.record_resolution(PROCESS_TERMINATION);

        for (_, listener) in &mut self.listeners {
            listener.on_deadlock_resolved(&deadlocked, PROCESS_TERMINATION);
        }

        self.record_state();
        Ok(victim)
    }

    /// Run a prevention strategy analyzer against the live state.
    pub fn apply_prevention(&mut self, strategy: PreventionStrategy) -> String {
        let report = dlsim_prevention::apply(strategy, &self.rag, &self.safety);
        self.tracker
            .update_status(format!("Applied {strategy} strategy"));
        report
    }

    // === History navigation ===

    /// Whether an older snapshot exists.
    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a newer snapshot exists.
    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Step the cursor back one snapshot and restore it wholesale.
    pub fn go_back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.cursor -= 1;
        self.restore_cursor();
        true
    }

    /// Step the cursor forward one snapshot and restore it wholesale.
    pub fn go_forward(&mut self) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.cursor += 1;
        self.restore_cursor();
        true
    }

    /// The snapshot at the history cursor.
    pub fn current_state(&self) -> &SystemState {
        &self.history[self.cursor]
    }

    // === Listeners ===

    /// Register a listener; returns a handle for removal.
    pub fn add_deadlock_listener(&mut self, listener: Box<dyn DeadlockListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Deregister a listener. Returns false if the handle is unknown.
    pub fn remove_deadlock_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(key, _)| *key != id);
        self.listeners.len() != before
    }

    // === Accessors ===

    /// The live Banker's safety state.
    pub fn safety(&self) -> &SafetyState {
        &self.safety
    }

    /// Mutable access to the live safety state, for scenario setup.
    pub fn safety_mut(&mut self) -> &mut SafetyState {
        &mut self.safety
    }

    /// The live resource-allocation graph.
    pub fn graph(&self) -> &ResourceAllocationGraph {
        &self.rag
    }

    /// Mutable access to the live graph, for scenario setup.
    pub fn graph_mut(&mut self) -> &mut ResourceAllocationGraph {
        &mut self.rag
    }

    /// Overwrite the maximum claim row for process `p`.
    pub fn set_max_demand(&mut self, p: usize, max_demand: &[Units]) -> Result<()> {
        self.safety.set_max_demand(p, max_demand)
    }

    /// Deadlock statistics for this engine instance.
    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Capture the live state into the history, discarding any
    /// snapshots after the cursor (branch-discarding undo/redo).
    pub fn record_state(&mut self) {
        self.history.truncate(self.cursor + 1);
        self.history.push(SystemState::capture(&self.safety, &self.rag));
        self.cursor = self.history.len() - 1;
    }

    fn restore_cursor(&mut self) {
        let (safety, rag) = self.history[self.cursor].restore();
        self.safety = safety;
        self.rag = rag;
        debug!(cursor = self.cursor, "restored snapshot");
    }

    fn raise_detection(&mut self) {
        let processes = self.rag.deadlocked_processes();
        let event = self.tracker.record_detection(processes.clone());
        for (_, listener) in &mut self.listeners {
            listener.on_deadlock_detected(&processes, &event);
        }
    }
}
