//! Deadlock prevention strategy analyzers.
//!
//! Every strategy here is a pure function over the current
//! resource-allocation graph and safety state: it inspects, never
//! mutates, and produces a human-readable advisory report. Prevention
//! is distinct from avoidance (the Banker check applied at request
//! time): these reports describe actions a collaborator could take
//! to keep circular waits from forming.

#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dlsim_core::{ResourceAllocationGraph, SafetyState};

/// Advisory prevention strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreventionStrategy {
    /// Reorder multi-resource requests by ascending resource index
    ResourceOrdering,
    /// List preemption candidates held by deadlocked processes
    Preemption,
    /// List timeout candidates among deadlocked processes' requests
    Timeout,
    /// Check whether each process's full Need is satisfiable at once
    AllOrNothing,
    /// Older waits, younger dies (non-preemptive timestamp ordering)
    WaitDie,
    /// Older wounds younger, younger waits (preemptive ordering)
    WoundWait,
}

impl PreventionStrategy {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreventionStrategy::ResourceOrdering => "Resource Ordering",
            PreventionStrategy::Preemption => "Preemption",
            PreventionStrategy::Timeout => "Timeout",
            PreventionStrategy::AllOrNothing => "All-or-Nothing",
            PreventionStrategy::WaitDie => "Wait-Die",
            PreventionStrategy::WoundWait => "Wound-Wait",
        }
    }

    /// All strategies, in report order.
    pub fn all() -> [PreventionStrategy; 6] {
        [
            PreventionStrategy::ResourceOrdering,
            PreventionStrategy::Preemption,
            PreventionStrategy::Timeout,
            PreventionStrategy::AllOrNothing,
            PreventionStrategy::WaitDie,
            PreventionStrategy::WoundWait,
        ]
    }
}

impl fmt::Display for PreventionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreventionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "resource-ordering" | "ordering" => Ok(PreventionStrategy::ResourceOrdering),
            "preemption" => Ok(PreventionStrategy::Preemption),
            "timeout" => Ok(PreventionStrategy::Timeout),
            "all-or-nothing" => Ok(PreventionStrategy::AllOrNothing),
            "wait-die" => Ok(PreventionStrategy::WaitDie),
            "wound-wait" => Ok(PreventionStrategy::WoundWait),
            other => Err(format!("unknown prevention strategy: {other}")),
        }
    }
}

/// Run one strategy against the current state and render its report.
pub fn apply(
    strategy: PreventionStrategy,
    rag: &ResourceAllocationGraph,
    safety: &SafetyState,
) -> String {
    debug!(%strategy, "applying prevention strategy");

    match strategy {
        PreventionStrategy::ResourceOrdering => resource_ordering(rag),
        PreventionStrategy::Preemption => preemption(rag),
        PreventionStrategy::Timeout => timeout(rag),
        PreventionStrategy::AllOrNothing => all_or_nothing(safety),
        PreventionStrategy::WaitDie => ordered_wait(rag, Ordering::WaitDie),
        PreventionStrategy::WoundWait => ordered_wait(rag, Ordering::WoundWait),
    }
}

fn resource_ordering(rag: &ResourceAllocationGraph) -> String {
    let mut body = String::new();

    for p in 0..rag.num_processes() {
        let requested = rag.requests_of(p);
        if requested.len() < 2 {
            continue;
        }

        // requests_of already yields ascending resource indices.
        body.push_str(&format!("Process P{p}: reordered resource requests to:"));
        for r in &requested {
            body.push_str(&format!(" R{r}"));
        }
        body.push('\n');
    }

    if body.is_empty() {
        return "No resource reordering needed.".to_string();
    }
    format!("Applied Resource Ordering Strategy:\n{body}")
}

fn preemption(rag: &ResourceAllocationGraph) -> String {
    let deadlocked = rag.deadlocked_processes();
    if deadlocked.is_empty() {
        return "No deadlock detected, no preemption needed.".to_string();
    }

    let mut body = String::new();
    for &p in &deadlocked {
        body.push_str(&format!("Process P{p}:"));
        let mut holds_any = false;

        for (r, &units) in rag.allocation_edges()[p].iter().enumerate() {
            if units > 0 {
                body.push_str(&format!(" preempt R{r} ({units} units)"));
                holds_any = true;
            }
        }

        if !holds_any {
            body.push_str(" no resources to preempt.");
        }
        body.push('\n');
    }

    format!("Applied Preemption Strategy:\n{body}")
}

fn timeout(rag: &ResourceAllocationGraph) -> String {
    let deadlocked = rag.deadlocked_processes();
    if deadlocked.is_empty() {
        return "No deadlock detected, no timeouts needed.".to_string();
    }

    let mut body = String::new();
    for &p in &deadlocked {
        body.push_str(&format!("Process P{p}:"));
        let mut requests_any = false;

        for r in 0..rag.num_resources() {
            let units = rag.request_edges()[r][p];
            if units > 0 {
                body.push_str(&format!(" timeout request for R{r} ({units} units)"));
                requests_any = true;
            }
        }

        if !requests_any {
            body.push_str(" no requests to timeout.");
        }
        body.push('\n');
    }

    format!("Applied Timeout Strategy:\n{body}")
}

fn all_or_nothing(safety: &SafetyState) -> String {
    let mut body = String::new();

    for p in 0..safety.num_processes() {
        let satisfiable = (0..safety.num_resources())
            .all(|r| safety.need()[p][r] <= safety.available()[r]);

        if satisfiable {
            body.push_str(&format!(
                "Process P{p}: can acquire all needed resources at once.\n"
            ));
        } else {
            body.push_str(&format!(
                "Process P{p}: cannot acquire all needed resources at once - would need to wait.\n"
            ));
        }
    }

    format!("Applied All-or-Nothing Strategy:\n{body}")
}

/// Timestamp-ordering family. Process index doubles as age: a lower
/// index is the older process.
#[derive(Clone, Copy)]
enum Ordering {
    WaitDie,
    WoundWait,
}

/// The per-process verdict of a Wait-Die / Wound-Wait scan.
enum Verdict {
    /// Abort the requester (Wait-Die) against the given holder
    Dies { resource: usize, holder: usize },
    /// Preempt the holder (Wound-Wait)
    Wounds { resource: usize, holder: usize },
    /// Requester keeps waiting on the given holder
    Waits { resource: usize, holder: usize },
    /// No other process holds anything the requester wants
    NoContention,
}

fn ordered_wait(rag: &ResourceAllocationGraph, ordering: Ordering) -> String {
    let deadlocked = rag.deadlocked_processes();
    if deadlocked.is_empty() {
        let name = match ordering {
            Ordering::WaitDie => "wait-die",
            Ordering::WoundWait => "wound-wait",
        };
        return format!("No deadlock detected, no {name} action needed.");
    }

    let mut body = String::new();
    for &p in &deadlocked {
        match scan_holders(rag, p, ordering) {
            Verdict::Dies { resource, holder } => body.push_str(&format!(
                "Process P{p}: dies - aborted requesting R{resource} held by older P{holder}\n"
            )),
            Verdict::Wounds { resource, holder } => body.push_str(&format!(
                "Process P{p}: wounds P{holder} - preempts R{resource} from younger process\n"
            )),
            Verdict::Waits { resource, holder } => body.push_str(&format!(
                "Process P{p}: waits for R{resource} held by P{holder}\n"
            )),
            Verdict::NoContention => {
                body.push_str(&format!("Process P{p}: no contended requests\n"))
            }
        }
    }

    let header = match ordering {
        Ordering::WaitDie => "Applied Wait-Die Strategy:",
        Ordering::WoundWait => "Applied Wound-Wait Strategy:",
    };
    format!("{header}\n{body}")
}

/// Evaluate requester `p` against the holders of everything it
/// requests, ascending resource then ascending holder index. The
/// first holder satisfying the abort/wound condition terminates the
/// scan; otherwise the first other holder yields a wait verdict.
fn scan_holders(rag: &ResourceAllocationGraph, p: usize, ordering: Ordering) -> Verdict {
    let mut waiting_on = None;

    for r in rag.requests_of(p) {
        for q in 0..rag.num_processes() {
            if q == p || rag.allocation_edges()[q][r] == 0 {
                continue;
            }

            match ordering {
                // Older (lower index) waits; younger dies.
                Ordering::WaitDie if p > q => return Verdict::Dies { resource: r, holder: q },
                // Older wounds the younger holder; younger waits.
                Ordering::WoundWait if p < q => return Verdict::Wounds { resource: r, holder: q },
                _ => {
                    waiting_on.get_or_insert(Verdict::Waits { resource: r, holder: q });
                }
            }
        }
    }

    waiting_on.unwrap_or(Verdict::NoContention)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two processes deadlocked over two single-unit resources.
    fn two_cycle() -> (ResourceAllocationGraph, SafetyState) {
        let mut rag = ResourceAllocationGraph::new(2, 2);
        rag.add_allocation(0, 0, 1);
        rag.add_allocation(1, 1, 1);
        rag.add_request(0, 1, 1);
        rag.add_request(1, 0, 1);

        let mut safety = SafetyState::new(2, 2, vec![1, 1]).unwrap();
        safety.set_max_demand(0, &[1, 1]).unwrap();
        safety.set_max_demand(1, &[1, 1]).unwrap();
        safety.allocate(0, 0, 1).unwrap();
        safety.allocate(1, 1, 1).unwrap();

        (rag, safety)
    }

    #[test]
    fn test_strategy_round_trips_from_str() {
        for strategy in PreventionStrategy::all() {
            let parsed: PreventionStrategy = strategy.as_str().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert!("no-such-strategy".parse::<PreventionStrategy>().is_err());
    }

    #[test]
    fn test_resource_ordering_reports_multi_request_processes() {
        let mut rag = ResourceAllocationGraph::new(2, 3);
        rag.add_request(0, 2, 1);
        rag.add_request(0, 0, 1);

        let report = resource_ordering(&rag);
        assert!(report.contains("Process P0: reordered resource requests to: R0 R2"));
        assert!(!report.contains("P1"));
    }

    #[test]
    fn test_resource_ordering_no_op_without_multi_requests() {
        let rag = ResourceAllocationGraph::new(2, 2);
        assert_eq!(resource_ordering(&rag), "No resource reordering needed.");
    }

    #[test]
    fn test_preemption_lists_held_resources() {
        let (rag, _) = two_cycle();
        let report = preemption(&rag);
        assert!(report.contains("Process P0: preempt R0 (1 units)"));
        assert!(report.contains("Process P1: preempt R1 (1 units)"));
    }

    #[test]
    fn test_preemption_without_deadlock() {
        let rag = ResourceAllocationGraph::new(2, 2);
        assert_eq!(preemption(&rag), "No deadlock detected, no preemption needed.");
    }

    #[test]
    fn test_timeout_lists_pending_requests() {
        let (rag, _) = two_cycle();
        let report = timeout(&rag);
        assert!(report.contains("Process P0: timeout request for R1 (1 units)"));
        assert!(report.contains("Process P1: timeout request for R0 (1 units)"));
    }

    #[test]
    fn test_all_or_nothing_reports_both_cases() {
        let (_, safety) = two_cycle();
        // Both need their second unit-resource; none are available.
        let report = all_or_nothing(&safety);
        assert!(report.contains("Process P0: cannot acquire"));
        assert!(report.contains("Process P1: cannot acquire"));

        let idle = SafetyState::new(1, 1, vec![3]).unwrap();
        let report = all_or_nothing(&idle);
        assert!(report.contains("Process P0: can acquire"));
    }

    #[test]
    fn test_wait_die_older_waits_younger_dies() {
        let (rag, safety) = two_cycle();
        let report = apply(PreventionStrategy::WaitDie, &rag, &safety);

        // P0 (older) waits on P1's resource; P1 (younger) is aborted.
        assert!(report.contains("Process P0: waits for R1 held by P1"));
        assert!(report.contains("Process P1: dies - aborted requesting R0 held by older P0"));
    }

    #[test]
    fn test_wound_wait_older_preempts_younger_waits() {
        let (rag, safety) = two_cycle();
        let report = apply(PreventionStrategy::WoundWait, &rag, &safety);

        assert!(report.contains("Process P0: wounds P1 - preempts R1"));
        assert!(report.contains("Process P1: waits for R0 held by P0"));
    }

    #[test]
    fn test_ordered_wait_without_deadlock() {
        let rag = ResourceAllocationGraph::new(2, 2);
        let safety = SafetyState::new(2, 2, vec![1, 1]).unwrap();
        assert!(apply(PreventionStrategy::WaitDie, &rag, &safety).contains("No deadlock"));
        assert!(apply(PreventionStrategy::WoundWait, &rag, &safety).contains("No deadlock"));
    }
}
