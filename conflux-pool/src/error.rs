//! Error types for pool operations.

use thiserror::Error;

/// Errors surfaced by [`crate::Pool`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The capacity bounds do not describe a usable pool.
    #[error("invalid pool capacity: min {min} must not exceed max {max}, and max must be positive")]
    InvalidCapacity {
        /// Requested warm minimum.
        min: usize,
        /// Requested upper bound.
        max: usize,
    },

    /// The pool has been closed; no further borrows are possible.
    #[error("pool is closed")]
    Closed,

    /// No resource became available within the requested window.
    #[error("timed out waiting for a pooled resource")]
    Timeout,
}
