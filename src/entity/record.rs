//! VersionedRecord - one immutable version of an entity
//!
//! A record binds an entity identifier to a version stamp, a lifecycle
//! status, and (for write-path versions) the entity content of that
//! revision. Once committed, a record never changes; updates and deletes
//! append new records, and prior versions remain readable at their stamp.
//!
//! Deletes are explicit `Deleted`-status records, not missing data.

use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, VersionStamp};

/// Lifecycle status of a single version record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    /// Durably recorded but not yet committed; never visible to reads.
    /// A crash leaves this behind for the reconciliation pass.
    Partial,
    /// Fully committed content version.
    Complete,
    /// Explicit deletion marker; committed, but hides the entity.
    Deleted,
}

impl VersionStatus {
    /// Returns true for statuses that participate in "latest committed"
    /// selection. Partial versions never do.
    #[inline]
    pub fn is_committed(&self) -> bool {
        matches!(self, VersionStatus::Complete | VersionStatus::Deleted)
    }

    /// Returns the status name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Partial => "partial",
            VersionStatus::Complete => "complete",
            VersionStatus::Deleted => "deleted",
        }
    }
}

/// One version of an entity: identifier, stamp, status, and optional
/// content. Tombstones carry no content; write-path records always do.
///
/// Fields are private; a record is reshaped only through `with_status`,
/// which produces the committed twin of a partial record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    id: EntityId,
    stamp: VersionStamp,
    status: VersionStatus,
    entity: Option<Entity>,
}

impl VersionedRecord {
    /// Creates a record from its parts.
    pub fn new(
        id: EntityId,
        stamp: VersionStamp,
        status: VersionStatus,
        entity: Option<Entity>,
    ) -> Self {
        Self {
            id,
            stamp,
            status,
            entity,
        }
    }

    /// Creates the partial (pre-commit) record for a write. The record
    /// identifier is taken from the entity content.
    pub fn partial(entity: Entity, stamp: VersionStamp) -> Self {
        Self::new(
            entity.id().clone(),
            stamp,
            VersionStatus::Partial,
            Some(entity),
        )
    }

    /// Creates a tombstone record marking the entity deleted at `stamp`.
    pub fn tombstone(id: EntityId, stamp: VersionStamp) -> Self {
        Self::new(id, stamp, VersionStatus::Deleted, None)
    }

    /// Returns the entity identifier.
    #[inline]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the version stamp.
    #[inline]
    pub fn stamp(&self) -> VersionStamp {
        self.stamp
    }

    /// Returns the lifecycle status.
    #[inline]
    pub fn status(&self) -> VersionStatus {
        self.status
    }

    /// Returns the entity content, absent for tombstones.
    #[inline]
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    /// Returns true if this record is a deletion marker.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.status == VersionStatus::Deleted
    }

    /// Returns this record with a different status. Used by the commit
    /// stage to produce the Complete twin of a Partial record.
    pub fn with_status(mut self, status: VersionStatus) -> Self {
        self.status = status;
        self
    }
}
