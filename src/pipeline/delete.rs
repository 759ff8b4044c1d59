//! Delete pipeline stages
//!
//! Order: ValidateDelete -> VerifyDeleteTarget -> MarkTombstone.
//!
//! A delete never removes history. It appends one more version whose
//! status is Deleted; the entity is invisible to latest reads from then
//! on, while every prior version stays readable at its own stamp.

use std::sync::Arc;

use crate::entity::{VersionStatus, VersionedRecord};
use crate::index::UniquenessIndex;
use crate::observability::{Logger, Severity};
use crate::storage::VersionStore;

use super::errors::{PipelineError, PipelineResult};
use super::event::PipelineEvent;
use super::stage::{Stage, StageFuture};
use super::validate;

/// State threaded through the delete stages.
#[derive(Clone, Debug)]
pub struct DeleteState {
    /// The tombstone to append, stamped at submission.
    pub record: VersionedRecord,
    /// Caller-supplied expected prior version. None deletes
    /// unconditionally.
    pub expected: Option<crate::entity::VersionStamp>,
    /// The committed version the tombstone supersedes, found by
    /// VerifyDeleteTarget.
    pub prior: Option<VersionedRecord>,
}

impl DeleteState {
    /// Creates the state for one delete submission.
    pub fn new(record: VersionedRecord, expected: Option<crate::entity::VersionStamp>) -> Self {
        Self {
            record,
            expected,
            prior: None,
        }
    }
}

/// Shared contract check for delete events.
fn contract(event: &PipelineEvent<DeleteState>) -> PipelineResult<()> {
    validate::verify_scope(&event.scope)?;
    validate::verify_record(&event.payload.record)
}

/// Runs the validation contract and nothing else.
pub struct ValidateDelete;

impl Stage<DeleteState> for ValidateDelete {
    fn name(&self) -> &'static str {
        "validate_delete"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<DeleteState>) -> StageFuture<'a, DeleteState> {
        Box::pin(async move {
            contract(&event)?;
            Ok(event)
        })
    }
}

/// Resolves the version being deleted. Deleting an entity with no visible
/// version is NotFound; an expected version that is not the latest
/// committed one is a conflict.
pub struct VerifyDeleteTarget {
    store: Arc<dyn VersionStore>,
}

impl VerifyDeleteTarget {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<DeleteState> for VerifyDeleteTarget {
    fn name(&self) -> &'static str {
        "verify_delete_target"
    }

    fn apply<'a>(&'a self, mut event: PipelineEvent<DeleteState>) -> StageFuture<'a, DeleteState> {
        Box::pin(async move {
            contract(&event)?;

            let latest = self
                .store
                .latest_committed(&event.scope, event.payload.record.id(), None)
                .await?;
            let target = match latest {
                None => None,
                Some(record) if record.is_tombstone() => None,
                Some(record) => Some(record),
            };
            let Some(target) = target else {
                return Err(PipelineError::NotFound {
                    id: event.payload.record.id().clone(),
                });
            };

            if let Some(expected) = event.payload.expected {
                if target.stamp() != expected {
                    return Err(PipelineError::VersionConflict {
                        id: event.payload.record.id().clone(),
                        expected: Some(expected),
                        actual: Some(target.stamp()),
                    });
                }
            }
            event.payload.prior = Some(target);
            Ok(event)
        })
    }
}

/// Appends the tombstone and releases the entity's unique-value claims.
/// For an expected-version delete the append is guarded against versions
/// committed after that base.
pub struct MarkTombstone {
    store: Arc<dyn VersionStore>,
    index: Arc<dyn UniquenessIndex>,
}

impl MarkTombstone {
    pub fn new(store: Arc<dyn VersionStore>, index: Arc<dyn UniquenessIndex>) -> Self {
        Self { store, index }
    }
}

impl Stage<DeleteState> for MarkTombstone {
    fn name(&self) -> &'static str {
        "mark_tombstone"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<DeleteState>) -> StageFuture<'a, DeleteState> {
        Box::pin(async move {
            contract(&event)?;

            if event.payload.record.status() != VersionStatus::Deleted {
                return Err(PipelineError::InvalidArgument {
                    field: "record.status",
                    reason: format!(
                        "tombstone requires a deleted record, got {}",
                        event.payload.record.status().as_str()
                    ),
                });
            }

            let guard = event
                .payload
                .expected
                .map(|expected| event.payload.prior.as_ref().map_or(expected, |p| p.stamp()));
            let inserted = self
                .store
                .insert_if_absent(&event.scope, &event.payload.record, guard)
                .await?;
            if !inserted {
                let latest = self
                    .store
                    .latest_committed(&event.scope, event.payload.record.id(), None)
                    .await?;
                return Err(PipelineError::VersionConflict {
                    id: event.payload.record.id().clone(),
                    expected: event.payload.expected,
                    actual: latest.map(|record| record.stamp()),
                });
            }

            self.index
                .release_owner(&event.scope, event.payload.record.id())
                .await?;

            let entity = event.payload.record.id().to_string();
            let stamp = event.payload.record.stamp().to_string();
            Logger::log(
                Severity::Info,
                "delete_commit",
                &[
                    ("collection", event.scope.name()),
                    ("entity", &entity),
                    ("stamp", &stamp),
                ],
            );
            Ok(event)
        })
    }
}
