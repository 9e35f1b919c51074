//! Error types for cache construction.

use thiserror::Error;

/// Errors surfaced by [`crate::Cache`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache capacity must be positive.
    #[error("cache capacity must be positive")]
    InvalidCapacity,
}
