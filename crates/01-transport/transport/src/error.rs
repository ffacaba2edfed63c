//! Error handling helpers for the transport crate.
//!
//! The error surface is limited to initialisation: capacity validation and
//! allocation failures. Once a strategy is built, overload is reported through
//! [`EmitOutcome`](crate::EmitOutcome) and never as an error.

use thiserror::Error;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced while bringing up rings, pools and strategies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Requested capacity is outside the supported range.
    #[error("capacity {requested} is invalid (must be between {minimum} and {maximum})")]
    InvalidCapacity {
        requested: usize,
        minimum: usize,
        maximum: usize,
    },
    /// Allocation of a backing region failed for the given size/alignment pair.
    #[error("failed to allocate region of {size} bytes aligned to {alignment}")]
    AllocationFailed { size: usize, alignment: usize },
}
