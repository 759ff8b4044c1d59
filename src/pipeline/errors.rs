//! Pipeline error types
//!
//! Contract violations (missing/invalid fields) are programming errors:
//! raised at the earliest stage that can detect them, before any storage
//! call, and never retried. Uniqueness and version conflicts are reported
//! to the caller, who may correct and resubmit. Storage failures pass
//! through unchanged.

use serde_json::Value;
use thiserror::Error;

use crate::entity::{EntityId, VersionStamp};
use crate::storage::StoreError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure raised by a pipeline stage.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    // ==================
    // Contract violations
    // ==================
    /// A mandatory field was absent.
    #[error("required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    /// A present field failed a structural or cross-consistency check.
    #[error("invalid value for {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    // ==================
    // Caller-resolvable conflicts
    // ==================
    /// A declared-unique field value is already claimed by another entity.
    #[error("unique field '{field}' value already claimed by {owner}")]
    UniquenessViolation {
        field: String,
        value: Value,
        owner: EntityId,
    },

    /// The caller's expected version is not the latest committed version.
    /// The caller must re-read and retry against the new latest.
    #[error("version conflict for {id}: expected {expected:?}, latest {actual:?}")]
    VersionConflict {
        id: EntityId,
        expected: Option<VersionStamp>,
        actual: Option<VersionStamp>,
    },

    /// No committed, visible version exists for the identifier.
    #[error("no visible version for {id}")]
    NotFound { id: EntityId },

    // ==================
    // Infrastructure
    // ==================
    /// The storage collaborator failed; not retried here.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl PipelineError {
    /// Returns true for contract violations - caller/programming errors
    /// that must never be retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PipelineError::RequiredFieldMissing { .. } | PipelineError::InvalidArgument { .. }
        )
    }
}
