//! Load pipeline stages
//!
//! Order: ValidateLoad -> LoadVersion.
//!
//! Visibility rule: the visible version for an identifier is the committed
//! version with the largest stamp not above the read bound (the bound is
//! the caller's snapshot stamp, or unbounded for latest reads). Partial
//! versions are never visible, whatever their stamp. If the visible
//! version is a tombstone, the identifier is invisible.

use std::sync::Arc;

use crate::entity::{EntityId, VersionStamp, VersionedRecord};
use crate::observability::{Logger, Severity};
use crate::storage::VersionStore;

use super::errors::{PipelineError, PipelineResult};
use super::event::PipelineEvent;
use super::stage::{Stage, StageFuture};
use super::validate;

/// State threaded through the load stages.
#[derive(Clone, Debug)]
pub struct LoadState {
    /// The identifier to read.
    pub id: EntityId,
    /// Snapshot bound; None reads the latest committed version.
    pub at: Option<VersionStamp>,
    /// The visible record, set by LoadVersion.
    pub record: Option<VersionedRecord>,
}

impl LoadState {
    /// Creates the state for one load submission.
    pub fn new(id: EntityId, at: Option<VersionStamp>) -> Self {
        Self {
            id,
            at,
            record: None,
        }
    }
}

/// Shared contract check for load events.
fn contract(event: &PipelineEvent<LoadState>) -> PipelineResult<()> {
    validate::verify_scope(&event.scope)?;
    validate::verify_id(&event.payload.id)?;
    if let Some(at) = event.payload.at {
        validate::verify_stamp(at)?;
    }
    Ok(())
}

/// Runs the validation contract and nothing else.
pub struct ValidateLoad;

impl Stage<LoadState> for ValidateLoad {
    fn name(&self) -> &'static str {
        "validate_load"
    }

    fn apply<'a>(&'a self, event: PipelineEvent<LoadState>) -> StageFuture<'a, LoadState> {
        Box::pin(async move {
            contract(&event)?;
            Ok(event)
        })
    }
}

/// Resolves the visible version under the event's read bound.
pub struct LoadVersion {
    store: Arc<dyn VersionStore>,
}

impl LoadVersion {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }
}

impl Stage<LoadState> for LoadVersion {
    fn name(&self) -> &'static str {
        "load_version"
    }

    fn apply<'a>(&'a self, mut event: PipelineEvent<LoadState>) -> StageFuture<'a, LoadState> {
        Box::pin(async move {
            contract(&event)?;

            let visible = self
                .store
                .latest_committed(&event.scope, &event.payload.id, event.payload.at)
                .await?;
            let record = match visible {
                None => None,
                Some(record) if record.is_tombstone() => None,
                Some(record) => Some(record),
            };
            let Some(record) = record else {
                return Err(PipelineError::NotFound {
                    id: event.payload.id.clone(),
                });
            };

            let entity = event.payload.id.to_string();
            let stamp = record.stamp().to_string();
            Logger::log(
                Severity::Trace,
                "load",
                &[
                    ("collection", event.scope.name()),
                    ("entity", &entity),
                    ("stamp", &stamp),
                ],
            );
            event.payload.record = Some(record);
            Ok(event)
        })
    }
}
