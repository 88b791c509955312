//! Single-victim deadlock recovery.
//!
//! The victim is the deadlocked process holding the fewest total
//! units, ties broken by input order. One call terminates exactly one
//! victim; a collaborator wanting full resolution re-runs detection
//! and recovery until no deadlock remains.

use tracing::info;

use dlsim_core::{ResourceAllocationGraph, Result, SafetyState};

/// Pick the deadlocked process with the minimum total allocation.
pub(crate) fn select_victim(deadlocked: &[usize], safety: &SafetyState) -> Option<usize> {
    deadlocked
        .iter()
        .copied()
        .min_by_key(|&p| safety.total_allocated(p))
}

/// Terminate one victim out of the deadlocked set.
///
/// Returns the terminated process, or `None` when the set is empty.
/// Termination releases the victim's full allocation back to
/// Available, zeroes its Max (and therefore Need) row, and clears all
/// of its graph edges.
pub(crate) fn resolve_deadlock(
    deadlocked: &[usize],
    safety: &mut SafetyState,
    rag: &mut ResourceAllocationGraph,
) -> Result<Option<usize>> {
    let Some(victim) = select_victim(deadlocked, safety) else {
        return Ok(None);
    };

    info!(
        victim,
        held = safety.total_allocated(victim),
        "terminating deadlock victim"
    );

    safety.terminate_process(victim)?;
    for r in 0..rag.num_resources() {
        rag.remove_request(victim, r);
        rag.remove_allocation(victim, r, u32::MAX);
    }

    Ok(Some(victim))
}
