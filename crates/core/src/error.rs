//! Error taxonomy for allocation-state operations.
//!
//! Business-logic denials (an unsafe request, an empty deadlock set)
//! are ordinary return values, never errors. The variants here cover
//! caller contract violations and internal-consistency failures; the
//! core cannot safely continue with corrupted matrices, so these are
//! raised instead of swallowed.

/// Error type for allocation-state operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while mutating or querying allocation state.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Process index outside `0..num_processes`
    #[error("process index {index} out of range (num_processes = {count})")]
    ProcessOutOfRange {
        /// Offending index
        index: usize,
        /// Configured process count
        count: usize,
    },

    /// Resource index outside `0..num_resources`
    #[error("resource index {index} out of range (num_resources = {count})")]
    ResourceOutOfRange {
        /// Offending index
        index: usize,
        /// Configured resource count
        count: usize,
    },

    /// A supplied row or vector has the wrong length
    #[error("dimension mismatch: expected {expected} entries, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Max demand set below the current allocation
    #[error(
        "need underflow for process {process}, resource {resource}: \
         max {max} is below current allocation {allocated}"
    )]
    NeedUnderflow {
        /// Process whose Need row would go negative
        process: usize,
        /// Resource column
        resource: usize,
        /// Requested maximum
        max: u32,
        /// Units currently allocated
        allocated: u32,
    },

    /// Release of more units than the process currently holds
    #[error(
        "process {process} holds {held} units of resource {resource}, cannot release {units}"
    )]
    ReleaseUnderflow {
        /// Releasing process
        process: usize,
        /// Resource column
        resource: usize,
        /// Units currently held
        held: u32,
        /// Units asked to release
        units: u32,
    },

    /// Allocation of more units than are currently available
    #[error("resource {resource} has {available} units available, cannot allocate {units}")]
    AvailableUnderflow {
        /// Resource column
        resource: usize,
        /// Free units
        available: u32,
        /// Units asked to allocate
        units: u32,
    },

    /// Allocation that would push a process past its maximum claim
    #[error(
        "allocating {units} units of resource {resource} to process {process} \
         would exceed its maximum claim of {max}"
    )]
    MaxExceeded {
        /// Requesting process
        process: usize,
        /// Resource column
        resource: usize,
        /// Units asked to allocate
        units: u32,
        /// Declared maximum claim
        max: u32,
    },
}
