//! Ready-made deadlock scenario synthesis.
//!
//! Builds classic allocation topologies directly into an engine:
//! the circular-wait chain, dining philosophers, and a randomized
//! scenario with optional deadlock injection. Randomized synthesis is
//! seedable so fixtures stay reproducible.

#![warn(missing_docs)]

use tracing::debug;

use dlsim_core::{CoreError, Units};
use dlsim_engine::AllocationEngine;

/// Error type for scenario synthesis.
pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Errors that can occur while synthesizing a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Scenario needs more participants than were requested
    #[error("scenario needs at least {required} {what}, got {actual}")]
    TooFew {
        /// Minimum count
        required: usize,
        /// Requested count
        actual: usize,
        /// What was being counted
        what: &'static str,
    },

    /// Underlying allocation-state failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Deterministic and randomized scenario constructors.
pub struct ScenarioSynthesizer {
    rng: fastrand::Rng,
}

impl Default for ScenarioSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioSynthesizer {
    /// Synthesizer with an entropy-seeded generator.
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Synthesizer with a fixed seed, for reproducible fixtures.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Build the classic circular-wait chain: process i holds one
    /// unit of resource i and requests resource (i+1) mod n. Always
    /// cyclic.
    pub fn circular_wait(&self, engine: &mut AllocationEngine, n: usize) -> Result<()> {
        if n < 2 {
            return Err(ScenarioError::TooFew {
                required: 2,
                actual: n,
                what: "processes",
            });
        }

        engine.initialize(n, n, vec![n as Units; n])?;

        for p in 0..n {
            let mut max = vec![0; n];
            max[p] = 2;
            max[(p + 1) % n] = 2;
            engine.set_max_demand(p, &max)?;
        }

        for p in 0..n {
            let held = p;
            let requested = (p + 1) % n;

            engine.safety_mut().allocate(p, held, 1)?;
            engine.graph_mut().add_allocation(p, held, 1);
            engine.graph_mut().add_request(p, requested, 1);
        }

        engine.record_state();
        debug!(n, "built circular-wait scenario");
        Ok(())
    }

    /// Build the dining philosophers table: n single-unit forks, each
    /// philosopher holds their left fork and requests their right.
    /// Always cyclic.
    pub fn dining_philosophers(&self, engine: &mut AllocationEngine, n: usize) -> Result<()> {
        if n < 2 {
            return Err(ScenarioError::TooFew {
                required: 2,
                actual: n,
                what: "philosophers",
            });
        }

        engine.initialize(n, n, vec![1; n])?;

        for p in 0..n {
            let left = p;
            let right = (p + 1) % n;

            let mut max = vec![0; n];
            max[left] = 1;
            max[right] = 1;
            engine.set_max_demand(p, &max)?;
        }

        for p in 0..n {
            let left = p;
            let right = (p + 1) % n;

            engine.safety_mut().allocate(p, left, 1)?;
            engine.graph_mut().add_allocation(p, left, 1);
            engine.graph_mut().add_request(p, right, 1);
        }

        engine.record_state();
        debug!(n, "built dining-philosophers scenario");
        Ok(())
    }

    /// Build a randomized partial allocation, then with probability
    /// `deadlock_probability` inject a circular request chain of 2–4
    /// hops over random process/resource pairs.
    ///
    /// The injection only adds request edges, so it does not guarantee
    /// a real cycle when the chosen pairs do not line up with actual
    /// holders.
    pub fn random(
        &mut self,
        engine: &mut AllocationEngine,
        num_processes: usize,
        num_resources: usize,
        deadlock_probability: f64,
    ) -> Result<()> {
        if num_processes < 2 {
            return Err(ScenarioError::TooFew {
                required: 2,
                actual: num_processes,
                what: "processes",
            });
        }
        if num_resources < 2 {
            return Err(ScenarioError::TooFew {
                required: 2,
                actual: num_resources,
                what: "resources",
            });
        }

        let available: Vec<Units> = (0..num_resources)
            .map(|_| 3 + self.rng.u32(0..num_processes as u32 * 2))
            .collect();
        engine.initialize(num_processes, num_resources, available)?;

        for p in 0..num_processes {
            let max: Vec<Units> = (0..num_resources).map(|_| 1 + self.rng.u32(0..3)).collect();
            engine.set_max_demand(p, &max)?;
        }

        // Partial allocation, clamped to both Max and Available.
        for p in 0..num_processes {
            for r in 0..num_resources {
                if self.rng.f64() >= 0.5 {
                    continue;
                }
                let wanted = 1 + self.rng.u32(0..2);
                let units = wanted
                    .min(engine.safety().max()[p][r])
                    .min(engine.safety().available()[r]);
                if units > 0 {
                    engine.safety_mut().allocate(p, r, units)?;
                    engine.graph_mut().add_allocation(p, r, units);
                }
            }
        }

        if self.rng.f64() < deadlock_probability {
            self.inject_request_chain(engine, num_processes, num_resources);
        }

        engine.record_state();
        debug!(
            num_processes,
            num_resources, deadlock_probability, "built random scenario"
        );
        Ok(())
    }

    fn inject_request_chain(
        &mut self,
        engine: &mut AllocationEngine,
        num_processes: usize,
        num_resources: usize,
    ) {
        let chain_len = 2 + self.rng.usize(0..(num_processes - 1).min(3));

        let processes: Vec<usize> = (0..chain_len)
            .map(|_| self.rng.usize(0..num_processes))
            .collect();
        let resources: Vec<usize> = (0..chain_len)
            .map(|_| self.rng.usize(0..num_resources))
            .collect();

        for i in 0..chain_len {
            let p = processes[i];
            let r = resources[(i + 1) % chain_len];
            engine.graph_mut().add_request(p, r, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_engine() -> AllocationEngine {
        AllocationEngine::new(1, 1, vec![0]).unwrap()
    }

    #[test]
    fn test_circular_wait_always_deadlocks() {
        let synth = ScenarioSynthesizer::with_seed(7);
        let mut engine = empty_engine();
        synth.circular_wait(&mut engine, 4).unwrap();

        assert!(engine.graph().detect_deadlock());
        let mut deadlocked = engine.deadlocked_processes();
        deadlocked.sort_unstable();
        assert_eq!(deadlocked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_circular_wait_needs_two_processes() {
        let synth = ScenarioSynthesizer::new();
        let mut engine = empty_engine();
        assert!(matches!(
            synth.circular_wait(&mut engine, 1),
            Err(ScenarioError::TooFew { actual: 1, .. })
        ));
    }

    #[test]
    fn test_dining_philosophers_always_deadlocks() {
        let synth = ScenarioSynthesizer::new();
        let mut engine = empty_engine();
        synth.dining_philosophers(&mut engine, 5).unwrap();

        assert!(engine.graph().detect_deadlock());
        assert_eq!(engine.deadlocked_processes().len(), 5);

        // Every fork is a single unit, fully claimed.
        assert!(engine.safety().available().iter().all(|&a| a == 0));
    }

    #[test]
    fn test_random_respects_max_and_conservation() {
        let mut synth = ScenarioSynthesizer::with_seed(42);
        let mut engine = empty_engine();
        synth.random(&mut engine, 6, 4, 1.0).unwrap();

        let allocation = engine.safety().allocation().to_vec();
        let available = engine.safety().available().to_vec();
        for p in 0..6 {
            for r in 0..4 {
                assert!(allocation[p][r] <= engine.safety().max()[p][r]);
            }
        }

        // The oldest snapshot holds the untouched pool; conservation
        // means held + free still adds up to it.
        while engine.go_back() {}
        let initial = engine.safety().available().to_vec();
        for r in 0..4 {
            let held: u32 = (0..6).map(|p| allocation[p][r]).sum();
            assert_eq!(held + available[r], initial[r]);
        }
    }

    #[test]
    fn test_random_is_reproducible_per_seed() {
        let mut a = ScenarioSynthesizer::with_seed(99);
        let mut b = ScenarioSynthesizer::with_seed(99);
        let mut engine_a = empty_engine();
        let mut engine_b = empty_engine();

        a.random(&mut engine_a, 5, 3, 0.8).unwrap();
        b.random(&mut engine_b, 5, 3, 0.8).unwrap();

        assert_eq!(
            engine_a.safety().allocation(),
            engine_b.safety().allocation()
        );
        assert_eq!(engine_a.safety().available(), engine_b.safety().available());
        assert_eq!(
            engine_a.graph().request_edges(),
            engine_b.graph().request_edges()
        );
    }

    #[test]
    fn test_random_zero_probability_injects_nothing() {
        let mut synth = ScenarioSynthesizer::with_seed(5);
        let mut engine = empty_engine();
        synth.random(&mut engine, 4, 3, 0.0).unwrap();

        let requests: u32 = engine
            .graph()
            .request_edges()
            .iter()
            .flatten()
            .copied()
            .sum();
        assert_eq!(requests, 0);
    }
}
