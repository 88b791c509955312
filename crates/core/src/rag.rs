//! Resource-allocation graph with cycle-based deadlock detection.
//!
//! The graph is bipartite: allocation edges run from processes to the
//! resource classes they hold, request edges from resource classes to
//! the processes waiting on them. Deadlock detection collapses the two
//! into a wait-for relation between processes and looks for a cycle.

use serde::{Deserialize, Serialize};

use crate::Units;

/// Bipartite allocation/request edge store.
///
/// Index arguments are assumed in range; the engine validates them
/// before calling in. Edge weights are unit counts, never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAllocationGraph {
    num_processes: usize,
    num_resources: usize,

    /// `allocation_edges[p][r]`: units of resource r held by process p
    allocation_edges: Vec<Vec<Units>>,

    /// `request_edges[r][p]`: units of resource r process p waits for
    request_edges: Vec<Vec<Units>>,
}

impl ResourceAllocationGraph {
    /// Create an empty graph for the given dimensions.
    pub fn new(num_processes: usize, num_resources: usize) -> Self {
        Self {
            num_processes,
            num_resources,
            allocation_edges: vec![vec![0; num_resources]; num_processes],
            request_edges: vec![vec![0; num_processes]; num_resources],
        }
    }

    /// Record that process `p` holds `units` of resource `r`.
    pub fn add_allocation(&mut self, p: usize, r: usize, units: Units) {
        self.allocation_edges[p][r] = units;
    }

    /// Record that process `p` is waiting for `units` of resource `r`.
    pub fn add_request(&mut self, p: usize, r: usize, units: Units) {
        self.request_edges[r][p] = units;
    }

    /// Shrink the allocation edge from `p` to `r`, clamped at zero.
    pub fn remove_allocation(&mut self, p: usize, r: usize, units: Units) {
        let edge = &mut self.allocation_edges[p][r];
        *edge = edge.saturating_sub(units);
    }

    /// Drop any pending request from `p` for `r`.
    pub fn remove_request(&mut self, p: usize, r: usize) {
        self.request_edges[r][p] = 0;
    }

    /// Number of processes this graph was sized for.
    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    /// Number of resource classes this graph was sized for.
    pub fn num_resources(&self) -> usize {
        self.num_resources
    }

    /// Allocation edge table, indexed `[process][resource]`.
    pub fn allocation_edges(&self) -> &[Vec<Units>] {
        &self.allocation_edges
    }

    /// Request edge table, indexed `[resource][process]`.
    pub fn request_edges(&self) -> &[Vec<Units>] {
        &self.request_edges
    }

    /// Resources process `p` is currently waiting on, ascending.
    pub fn requests_of(&self, p: usize) -> Vec<usize> {
        (0..self.num_resources)
            .filter(|&r| self.request_edges[r][p] > 0)
            .collect()
    }

    /// True iff the wait-for relation contains a cycle.
    ///
    /// From a process p there is a wait-for edge to every process q
    /// holding a resource p requests. This is the single-instance
    /// deadlock condition; with multi-unit resource classes it
    /// over-approximates, reporting cycles that fungible units could
    /// still break. That behavior is kept deliberately.
    pub fn detect_deadlock(&self) -> bool {
        let mut visited = vec![false; self.num_processes];
        let mut stack = vec![false; self.num_processes];

        (0..self.num_processes).any(|p| self.has_cycle(p, &mut visited, &mut stack))
    }

    fn has_cycle(&self, p: usize, visited: &mut [bool], stack: &mut [bool]) -> bool {
        if stack[p] {
            return true;
        }
        if visited[p] {
            return false;
        }

        visited[p] = true;
        stack[p] = true;

        for r in 0..self.num_resources {
            if self.request_edges[r][p] == 0 {
                continue;
            }
            for q in 0..self.num_processes {
                if self.allocation_edges[q][r] > 0 && self.has_cycle(q, visited, stack) {
                    return true;
                }
            }
        }

        stack[p] = false;
        false
    }

    /// Every process on a wait-for cycle, found by a full DFS sweep.
    ///
    /// A back edge into the recursion stack marks the whole stack
    /// segment from its target as deadlocked. Order is
    /// first-discovered; only that much is guaranteed stable.
    pub fn deadlocked_processes(&self) -> Vec<usize> {
        let mut deadlocked = Vec::new();
        let mut visited = vec![false; self.num_processes];
        let mut stack = vec![false; self.num_processes];
        let mut path = Vec::new();

        for p in 0..self.num_processes {
            if !visited[p] {
                self.collect_deadlocked(p, &mut visited, &mut stack, &mut path, &mut deadlocked);
            }
        }

        deadlocked
    }

    fn collect_deadlocked(
        &self,
        p: usize,
        visited: &mut [bool],
        stack: &mut [bool],
        path: &mut Vec<usize>,
        deadlocked: &mut Vec<usize>,
    ) {
        visited[p] = true;
        stack[p] = true;
        path.push(p);

        for r in 0..self.num_resources {
            if self.request_edges[r][p] == 0 {
                continue;
            }
            for q in 0..self.num_processes {
                if self.allocation_edges[q][r] == 0 {
                    continue;
                }
                if !visited[q] {
                    self.collect_deadlocked(q, visited, stack, path, deadlocked);
                } else if stack[q] {
                    // Back edge: everything on the path from q is cyclic.
                    let start = path.iter().position(|&n| n == q).unwrap_or(0);
                    for &member in &path[start..] {
                        if !deadlocked.contains(&member) {
                            deadlocked.push(member);
                        }
                    }
                }
            }
        }

        path.pop();
        stack[p] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three processes, each holding resource i and waiting on (i+1)%3.
    fn three_cycle() -> ResourceAllocationGraph {
        let mut rag = ResourceAllocationGraph::new(3, 3);
        for p in 0..3 {
            rag.add_allocation(p, p, 1);
            rag.add_request(p, (p + 1) % 3, 1);
        }
        rag
    }

    #[test]
    fn test_empty_graph_has_no_deadlock() {
        let rag = ResourceAllocationGraph::new(4, 2);
        assert!(!rag.detect_deadlock());
        assert!(rag.deadlocked_processes().is_empty());
    }

    #[test]
    fn test_three_cycle_detected() {
        let rag = three_cycle();
        assert!(rag.detect_deadlock());

        let mut deadlocked = rag.deadlocked_processes();
        deadlocked.sort_unstable();
        assert_eq!(deadlocked, vec![0, 1, 2]);
    }

    #[test]
    fn test_request_without_holder_is_not_deadlock() {
        let mut rag = ResourceAllocationGraph::new(2, 2);
        rag.add_request(0, 1, 1);
        assert!(!rag.detect_deadlock());
    }

    #[test]
    fn test_breaking_cycle_clears_deadlock() {
        let mut rag = three_cycle();
        rag.remove_request(2, 0);
        assert!(!rag.detect_deadlock());
        assert!(rag.deadlocked_processes().is_empty());
    }

    #[test]
    fn test_remove_allocation_clamps_at_zero() {
        let mut rag = ResourceAllocationGraph::new(1, 1);
        rag.add_allocation(0, 0, 2);
        rag.remove_allocation(0, 0, 5);
        assert_eq!(rag.allocation_edges()[0][0], 0);
    }

    #[test]
    fn test_requests_of_ascending() {
        let mut rag = ResourceAllocationGraph::new(1, 4);
        rag.add_request(0, 3, 1);
        rag.add_request(0, 1, 2);
        assert_eq!(rag.requests_of(0), vec![1, 3]);
    }

    #[test]
    fn test_clone_is_deep() {
        let rag = three_cycle();
        let mut copy = rag.clone();
        copy.remove_request(2, 0);

        assert!(rag.detect_deadlock());
        assert!(!copy.detect_deadlock());
    }
}
