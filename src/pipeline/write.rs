//! Write pipeline stages
//!
//! Order: ValidateWrite -> VerifyUniqueFields -> VerifyExpectedVersion ->
//! MarkStart -> VerifyWriteExclusive -> MarkCommit.
//!
//! The write is two-phase. MarkStart durably records the new version with
//! Partial status; MarkCommit flips it to Complete only after every prior
//! stage succeeded, guarded so that of all concurrent writers presenting
//! the same base version exactly one commits. A crash between the two
//! leaves a Partial marker that reads never return and a reconciliation
//! pass can later detect. Nothing here rolls a Partial back.

use std::sync::Arc;

use crate::entity::{VersionStamp, VersionStatus};
use crate::index::UniquenessIndex;
use crate::observability::{Logger, Severity};
use crate::storage::VersionStore;

use super::errors::{PipelineError, PipelineResult};
use super::event::PipelineEvent;
use super::stage::{Stage, StageFuture};
use super::validate;

/// State threaded through the write stages.
#[derive(Clone, Debug)]
pub struct WriteState {
    /// The version being written; Partial until MarkCommit.
    pub record: crate::entity::VersionedRecord,
    /// Caller-supplied expected prior version. None writes unconditionally.
    pub expected: Option<VersionStamp>,
    /// Latest committed stamp observed by VerifyExpectedVersion; the base
    /// the commit guard serializes against.
    pub base: Option<VersionStamp>,
}

impl WriteState {
    /// Creates the state for one write submission.
    pub fn new(record: crate::entity::VersionedRecord, expected: Option<VersionStamp>) -> Self {
        Self {
            record,
            expected,
            base: None,
        }
    }
}

/// Shared contract check for write events.
fn contract(event: &PipelineEvent<WriteState>) -> PipelineResult<()> {
    validate::verify_scope(&event.scope)?;
    validate::verify_record(&event.payload.record)
}

/// Runs the validation contract and nothing else. Keeping this as its own
/// stage makes "reject before any effect" observable at the pipeline head.
pub struct ValidateWrite;

impl Stage<WriteState> for ValidateWrite {
    fn name(&self) -> &'static str {
        "validate_write"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;
            Ok(event)
        })
    }
}

/// Claims every declared-unique field value for the writing entity.
/// A value held by a different entity fails the write.
pub struct VerifyUniqueFields {
    index: Arc<dyn UniquenessIndex>,
}

impl VerifyUniqueFields {
    pub fn new(index: Arc<dyn UniquenessIndex>) -> Self {
        Self { index }
    }
}

impl Stage<WriteState> for VerifyUniqueFields {
    fn name(&self) -> &'static str {
        "verify_unique_fields"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;

            if let Some(entity) = event.payload.record.entity() {
                for field in event.scope.unique_fields() {
                    let Some(value) = entity.field(field) else {
                        continue;
                    };
                    let holder = self
                        .index
                        .claim(&event.scope, field, value, event.payload.record.id())
                        .await?;
                    if let Some(owner) = holder {
                        return Err(PipelineError::UniquenessViolation {
                            field: field.clone(),
                            value: value.clone(),
                            owner,
                        });
                    }
                }
            }
            Ok(event)
        })
    }
}

/// Compares the caller's expected version against the latest committed
/// version and records the observed base for the commit guard.
pub struct VerifyExpectedVersion {
    store: Arc<dyn VersionStore>,
}

impl VerifyExpectedVersion {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<WriteState> for VerifyExpectedVersion {
    fn name(&self) -> &'static str {
        "verify_expected_version"
    }

    fn apply<'a>(&'a self, mut event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;

            let latest = self
                .store
                .latest_committed(&event.scope, event.payload.record.id(), None)
                .await?;
            let actual = latest.as_ref().map(|record| record.stamp());

            // A tombstone's stamp is a valid expected version: expecting it
            // recreates a deleted entity.
            if let Some(expected) = event.payload.expected {
                if actual != Some(expected) {
                    return Err(PipelineError::VersionConflict {
                        id: event.payload.record.id().clone(),
                        expected: Some(expected),
                        actual,
                    });
                }
            }
            event.payload.base = actual;
            Ok(event)
        })
    }
}

/// Durably records the Partial version: the crash-recovery marker and the
/// write's claim on its (identifier, stamp) slot.
pub struct MarkStart {
    store: Arc<dyn VersionStore>,
}

impl MarkStart {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<WriteState> for MarkStart {
    fn name(&self) -> &'static str {
        "mark_start"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;

            if event.payload.record.status() != VersionStatus::Partial {
                return Err(PipelineError::InvalidArgument {
                    field: "record.status",
                    reason: format!(
                        "write start requires a partial record, got {}",
                        event.payload.record.status().as_str()
                    ),
                });
            }

            let inserted = self
                .store
                .insert_if_absent(&event.scope, &event.payload.record, None)
                .await?;
            if !inserted {
                // The (identifier, stamp) slot is taken: a rival writer got
                // the same stamp first.
                return Err(PipelineError::VersionConflict {
                    id: event.payload.record.id().clone(),
                    expected: event.payload.expected,
                    actual: Some(event.payload.record.stamp()),
                });
            }

            let entity = event.payload.record.id().to_string();
            let stamp = event.payload.record.stamp().to_string();
            Logger::log(
                Severity::Trace,
                "write_start",
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

/// Early conflict detection after the Partial write: any rival version
/// committed between the observed base and this write's stamp means this
/// writer already lost. The commit guard remains authoritative; this stage
/// just fails sooner and cheaper.
pub struct VerifyWriteExclusive {
    store: Arc<dyn VersionStore>,
}

impl VerifyWriteExclusive {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<WriteState> for VerifyWriteExclusive {
    fn name(&self) -> &'static str {
        "verify_write_exclusive"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;

            // Unconditional writes are last-wins; only writers that named a
            // base version get the exclusivity guarantee.
            if event.payload.expected.is_none() {
                return Ok(event);
            }

            let low = event.payload.base.unwrap_or(VersionStamp::new(0));
            let window = self
                .store
                .versions_between(
                    &event.scope,
                    event.payload.record.id(),
                    low,
                    event.payload.record.stamp(),
                )
                .await?;
            let rival = window
                .iter()
                .filter(|record| record.status().is_committed())
                .last();
            if let Some(rival) = rival {
                return Err(PipelineError::VersionConflict {
                    id: event.payload.record.id().clone(),
                    expected: event.payload.expected,
                    actual: Some(rival.stamp()),
                });
            }
            Ok(event)
        })
    }
}

/// Flips the Partial record to Complete. For optimistic writes the flip is
/// guarded: it fails if any version committed after the observed base,
/// which serializes concurrent writers at the store.
pub struct MarkCommit {
    store: Arc<dyn VersionStore>,
}

impl MarkCommit {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<WriteState> for MarkCommit {
    fn name(&self) -> &'static str {
        "mark_commit"
    }

    fn apply<'a>(&'a self, mut event: PipelineEvent<WriteState>) -> StageFuture<'a, WriteState> {
        Box::pin(async move {
            contract(&event)?;

            let guard = event
                .payload
                .expected
                .map(|_| event.payload.base.unwrap_or(VersionStamp::new(0)));
            let flipped = self
                .store
                .update_status(
                    &event.scope,
                    event.payload.record.id(),
                    event.payload.record.stamp(),
                    VersionStatus::Partial,
                    VersionStatus::Complete,
                    guard,
                )
                .await?;
            if !flipped {
                // Lost the commit race; the Partial stays behind for the
                // reconciliation pass.
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

            event.payload.record = event
                .payload
                .record
                .clone()
                .with_status(VersionStatus::Complete);

            let entity = event.payload.record.id().to_string();
            let stamp = event.payload.record.stamp().to_string();
            Logger::log(
                Severity::Info,
                "write_commit",
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
