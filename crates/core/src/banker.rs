//! Banker's-algorithm safety state.
//!
//! Owns the Allocation, Max and Need matrices plus the Available
//! vector. Need is derived state: it is recomputed from Max and
//! Allocation after every mutation and never set independently.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{CoreError, Result, Units};

/// Matrix state for the Banker's safety algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyState {
    num_processes: usize,
    num_resources: usize,
    allocation: Vec<Vec<Units>>,
    max: Vec<Vec<Units>>,
    need: Vec<Vec<Units>>,
    available: Vec<Units>,
}

impl SafetyState {
    /// Create a fresh state with empty allocations.
    pub fn new(num_processes: usize, num_resources: usize, available: Vec<Units>) -> Result<Self> {
        if available.len() != num_resources {
            return Err(CoreError::DimensionMismatch {
                expected: num_resources,
                actual: available.len(),
            });
        }

        Ok(Self {
            num_processes,
            num_resources,
            allocation: vec![vec![0; num_resources]; num_processes],
            max: vec![vec![0; num_resources]; num_processes],
            need: vec![vec![0; num_resources]; num_processes],
            available,
        })
    }

    /// Number of processes.
    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    /// Number of resource classes.
    pub fn num_resources(&self) -> usize {
        self.num_resources
    }

    /// Overwrite the maximum claim row for process `p`.
    pub fn set_max_demand(&mut self, p: usize, max_demand: &[Units]) -> Result<()> {
        self.check_process(p)?;
        if max_demand.len() != self.num_resources {
            return Err(CoreError::DimensionMismatch {
                expected: self.num_resources,
                actual: max_demand.len(),
            });
        }

        self.max[p].copy_from_slice(max_demand);
        self.recompute_need_row(p)
    }

    /// Speculative Banker check for a single-resource request.
    ///
    /// Rejects immediately if the request would exceed the process's
    /// maximum claim or the available units. Otherwise the allocation
    /// is applied tentatively, the safety scan runs, and the change is
    /// rolled back unconditionally; no side effect survives this call.
    pub fn is_request_safe(&mut self, p: usize, r: usize, units: Units) -> Result<bool> {
        self.check_process(p)?;
        self.check_resource(r)?;

        // checked_add: an absurdly large request is still a denial,
        // never an overflow.
        match self.allocation[p][r].checked_add(units) {
            Some(total) if total <= self.max[p][r] => {}
            _ => return Ok(false),
        }
        if units > self.available[r] {
            return Ok(false);
        }

        // Tentatively grant, scan, roll back.
        self.available[r] -= units;
        self.allocation[p][r] += units;
        self.need[p][r] = self.max[p][r] - self.allocation[p][r];

        let safe = self.run_safety_scan().is_some();

        self.available[r] += units;
        self.allocation[p][r] -= units;
        self.need[p][r] = self.max[p][r] - self.allocation[p][r];

        trace!(process = p, resource = r, units, safe, "speculative safety check");
        Ok(safe)
    }

    /// True iff the current state is safe as it stands.
    pub fn is_safe(&self) -> bool {
        self.run_safety_scan().is_some()
    }

    /// A completion order under which every process can finish, if one
    /// exists.
    ///
    /// Processes are scanned in ascending index order on every pass
    /// and the first eligible one is taken, so the sequence is
    /// deterministic but not necessarily the only safe order.
    pub fn safe_sequence(&self) -> Option<Vec<usize>> {
        self.run_safety_scan()
    }

    fn run_safety_scan(&self) -> Option<Vec<usize>> {
        let mut work = self.available.clone();
        let mut finished = vec![false; self.num_processes];
        let mut sequence = Vec::with_capacity(self.num_processes);

        while sequence.len() < self.num_processes {
            let mut found = false;

            for p in 0..self.num_processes {
                if finished[p] {
                    continue;
                }
                let eligible = (0..self.num_resources).all(|r| self.need[p][r] <= work[r]);
                if eligible {
                    for r in 0..self.num_resources {
                        work[r] += self.allocation[p][r];
                    }
                    finished[p] = true;
                    sequence.push(p);
                    found = true;
                }
            }

            if !found {
                return None;
            }
        }

        Some(sequence)
    }

    /// Unconditionally commit an allocation.
    ///
    /// The caller is responsible for having validated safety first;
    /// this only enforces the hard invariants (claim ceiling,
    /// available floor).
    pub fn allocate(&mut self, p: usize, r: usize, units: Units) -> Result<()> {
        self.check_process(p)?;
        self.check_resource(r)?;

        let total = self.allocation[p][r].checked_add(units);
        if !total.is_some_and(|t| t <= self.max[p][r]) {
            return Err(CoreError::MaxExceeded {
                process: p,
                resource: r,
                units,
                max: self.max[p][r],
            });
        }
        if units > self.available[r] {
            return Err(CoreError::AvailableUnderflow {
                resource: r,
                available: self.available[r],
                units,
            });
        }

        self.allocation[p][r] += units;
        self.available[r] -= units;
        self.need[p][r] = self.max[p][r] - self.allocation[p][r];
        Ok(())
    }

    /// Unconditionally return units from a process to the pool.
    pub fn release(&mut self, p: usize, r: usize, units: Units) -> Result<()> {
        self.check_process(p)?;
        self.check_resource(r)?;

        if units > self.allocation[p][r] {
            return Err(CoreError::ReleaseUnderflow {
                process: p,
                resource: r,
                held: self.allocation[p][r],
                units,
            });
        }

        self.allocation[p][r] -= units;
        self.available[r] += units;
        self.need[p][r] = self.max[p][r] - self.allocation[p][r];
        Ok(())
    }

    /// Release everything process `p` holds and zero its maximum
    /// claim, returning the units to the pool. Used by recovery when a
    /// victim is terminated.
    pub fn terminate_process(&mut self, p: usize) -> Result<()> {
        self.check_process(p)?;

        for r in 0..self.num_resources {
            self.available[r] += self.allocation[p][r];
            self.allocation[p][r] = 0;
            self.max[p][r] = 0;
            self.need[p][r] = 0;
        }
        Ok(())
    }

    /// Allocation matrix, indexed `[process][resource]`.
    pub fn allocation(&self) -> &[Vec<Units>] {
        &self.allocation
    }

    /// Max matrix, indexed `[process][resource]`.
    pub fn max(&self) -> &[Vec<Units>] {
        &self.max
    }

    /// Need matrix, indexed `[process][resource]`.
    pub fn need(&self) -> &[Vec<Units>] {
        &self.need
    }

    /// Available vector, indexed by resource.
    pub fn available(&self) -> &[Units] {
        &self.available
    }

    /// Total units process `p` holds across all resource classes.
    pub fn total_allocated(&self, p: usize) -> Units {
        self.allocation[p].iter().sum()
    }

    fn recompute_need_row(&mut self, p: usize) -> Result<()> {
        for r in 0..self.num_resources {
            self.need[p][r] = self.max[p][r].checked_sub(self.allocation[p][r]).ok_or(
                CoreError::NeedUnderflow {
                    process: p,
                    resource: r,
                    max: self.max[p][r],
                    allocated: self.allocation[p][r],
                },
            )?;
        }
        Ok(())
    }

    fn check_process(&self, p: usize) -> Result<()> {
        if p >= self.num_processes {
            return Err(CoreError::ProcessOutOfRange {
                index: p,
                count: self.num_processes,
            });
        }
        Ok(())
    }

    fn check_resource(&self, r: usize) -> Result<()> {
        if r >= self.num_resources {
            return Err(CoreError::ResourceOutOfRange {
                index: r,
                count: self.num_resources,
            });
        }
        Ok(())
    }
}
