//! Storage error types
//!
//! Infrastructure failures surfaced by the version store and the uniqueness
//! index. These are never retried by the pipeline; retry policy, if any,
//! belongs to the storage client.

use thiserror::Error;

/// Result type for store and index operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure failure from a storage collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or its state is unusable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("storage request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The backend refused the request.
    #[error("storage rejected request: {0}")]
    Rejected(String),
}
