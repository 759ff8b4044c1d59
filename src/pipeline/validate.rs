//! Shared precondition contract
//!
//! Implemented once, invoked by every stage before stage-specific work, so
//! an event is rejected the same way at any pipeline position - callers
//! cannot rely on stage ordering to sanitize input. No storage or index
//! call may be issued by a stage whose contract check failed.
//!
//! Validity predicates, checked in order:
//! - scope: owner UUID non-nil, name non-empty (missing field otherwise)
//! - identifier: UUID non-nil and kind non-empty (missing field); a kind
//!   that is whitespace-only is present but malformed (invalid argument)
//! - version: the reserved unassigned stamp counts as missing
//! - record: identifier and version as above; entity content, when present,
//!   must carry a valid identifier equal to the record's (invalid argument
//!   on mismatch)

use crate::collection::CollectionScope;
use crate::entity::{EntityId, VersionStamp, VersionedRecord};

use super::errors::{PipelineError, PipelineResult};

/// Checks the collection scope every event must carry.
pub fn verify_scope(scope: &CollectionScope) -> PipelineResult<()> {
    if scope.owner().is_nil() {
        return Err(PipelineError::RequiredFieldMissing {
            field: "scope.owner",
        });
    }
    if scope.name().is_empty() {
        return Err(PipelineError::RequiredFieldMissing { field: "scope.name" });
    }
    Ok(())
}

/// Checks an identifier payload.
pub fn verify_id(id: &EntityId) -> PipelineResult<()> {
    verify_id_fields(id, "id.uuid", "id.kind")
}

/// Checks an identifier under caller-supplied field names, so wrapper and
/// content identifiers report distinguishable failures.
pub fn verify_id_fields(
    id: &EntityId,
    uuid_field: &'static str,
    kind_field: &'static str,
) -> PipelineResult<()> {
    if id.uuid().is_nil() {
        return Err(PipelineError::RequiredFieldMissing { field: uuid_field });
    }
    if id.kind().is_empty() {
        return Err(PipelineError::RequiredFieldMissing { field: kind_field });
    }
    if id.kind().trim().is_empty() {
        return Err(PipelineError::InvalidArgument {
            field: kind_field,
            reason: "kind is whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Checks a version stamp where one is required.
pub fn verify_stamp(stamp: VersionStamp) -> PipelineResult<()> {
    if !stamp.is_assigned() {
        return Err(PipelineError::RequiredFieldMissing { field: "version" });
    }
    Ok(())
}

/// Checks a versioned record payload: identifier, stamp, and the
/// cross-consistency of any entity content with the wrapping record.
pub fn verify_record(record: &VersionedRecord) -> PipelineResult<()> {
    verify_id(record.id())?;
    verify_stamp(record.stamp())?;

    if let Some(entity) = record.entity() {
        verify_id_fields(entity.id(), "entity.id.uuid", "entity.id.kind")?;
        if entity.id() != record.id() {
            return Err(PipelineError::InvalidArgument {
                field: "entity.id",
                reason: format!(
                    "entity content id {} does not match record id {}",
                    entity.id(),
                    record.id()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use uuid::Uuid;

    fn valid_scope() -> CollectionScope {
        CollectionScope::new(Uuid::new_v4(), "users")
    }

    #[test]
    fn test_valid_scope_passes() {
        assert!(verify_scope(&valid_scope()).is_ok());
    }

    #[test]
    fn test_nil_owner_is_missing() {
        let scope = CollectionScope::new(Uuid::nil(), "users");
        assert_eq!(
            verify_scope(&scope),
            Err(PipelineError::RequiredFieldMissing {
                field: "scope.owner"
            })
        );
    }

    #[test]
    fn test_empty_name_is_missing() {
        let scope = CollectionScope::new(Uuid::new_v4(), "");
        assert_eq!(
            verify_scope(&scope),
            Err(PipelineError::RequiredFieldMissing { field: "scope.name" })
        );
    }

    #[test]
    fn test_nil_uuid_is_missing() {
        let id = EntityId::new(Uuid::nil(), "user");
        assert_eq!(
            verify_id(&id),
            Err(PipelineError::RequiredFieldMissing { field: "id.uuid" })
        );
    }

    #[test]
    fn test_empty_kind_is_missing() {
        let id = EntityId::new(Uuid::new_v4(), "");
        assert_eq!(
            verify_id(&id),
            Err(PipelineError::RequiredFieldMissing { field: "id.kind" })
        );
    }

    #[test]
    fn test_blank_kind_is_invalid() {
        let id = EntityId::new(Uuid::new_v4(), "   ");
        assert!(matches!(
            verify_id(&id),
            Err(PipelineError::InvalidArgument {
                field: "id.kind",
                ..
            })
        ));
    }

    #[test]
    fn test_unassigned_stamp_is_missing() {
        assert_eq!(
            verify_stamp(VersionStamp::new(0)),
            Err(PipelineError::RequiredFieldMissing { field: "version" })
        );
        assert!(verify_stamp(VersionStamp::new(1)).is_ok());
    }

    #[test]
    fn test_record_with_matching_content_passes() {
        let entity = Entity::new(EntityId::generate("user"));
        let record = VersionedRecord::partial(entity, VersionStamp::new(1));
        assert!(verify_record(&record).is_ok());
    }

    #[test]
    fn test_tombstone_record_passes_without_content() {
        let record = VersionedRecord::tombstone(EntityId::generate("user"), VersionStamp::new(1));
        assert!(verify_record(&record).is_ok());
    }

    #[test]
    fn test_content_id_mismatch_is_invalid() {
        let entity = Entity::new(EntityId::generate("user"));
        let record = VersionedRecord::new(
            EntityId::generate("user"),
            VersionStamp::new(1),
            crate::entity::VersionStatus::Partial,
            Some(entity),
        );
        assert!(matches!(
            verify_record(&record),
            Err(PipelineError::InvalidArgument {
                field: "entity.id",
                ..
            })
        ));
    }

    #[test]
    fn test_content_id_checked_before_mismatch() {
        // Content with a nil identifier reports the missing field, not the
        // mismatch.
        let entity = Entity::new(EntityId::new(Uuid::nil(), "user"));
        let record = VersionedRecord::new(
            EntityId::generate("user"),
            VersionStamp::new(1),
            crate::entity::VersionStatus::Partial,
            Some(entity),
        );
        assert_eq!(
            verify_record(&record),
            Err(PipelineError::RequiredFieldMissing {
                field: "entity.id.uuid"
            })
        );
    }
}
