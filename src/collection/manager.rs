//! CollectionManager - public entry points
//!
//! Owns the three pipelines (write, delete, load), assembled once at
//! construction. Every call builds a fresh event, stamps it where a new
//! version is being produced, and runs it through the matching pipeline.

use std::sync::Arc;

use crate::entity::{Entity, EntityId, VersionClock, VersionStamp, VersionedRecord};
use crate::index::UniquenessIndex;
use crate::pipeline::delete::{DeleteState, MarkTombstone, ValidateDelete, VerifyDeleteTarget};
use crate::pipeline::load::{LoadState, LoadVersion, ValidateLoad};
use crate::pipeline::write::{
    MarkCommit, MarkStart, ValidateWrite, VerifyExpectedVersion, VerifyUniqueFields,
    VerifyWriteExclusive, WriteState,
};
use crate::pipeline::{Pipeline, PipelineError, PipelineEvent, PipelineResult};
use crate::storage::VersionStore;

use super::CollectionScope;

/// One create/update submission.
#[derive(Clone, Debug)]
pub struct WriteRequest {
    entity: Entity,
    expected: Option<VersionStamp>,
}

impl WriteRequest {
    /// An unconditional write: creates the entity or replaces the latest
    /// version, last-wins.
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            expected: None,
        }
    }

    /// Makes the write optimistic: it commits only if `stamp` is still the
    /// latest committed version at commit time.
    pub fn expecting(mut self, stamp: VersionStamp) -> Self {
        self.expected = Some(stamp);
        self
    }
}

/// Entry points for mutating and reading versioned entities.
pub struct CollectionManager {
    write_pipeline: Pipeline<WriteState>,
    delete_pipeline: Pipeline<DeleteState>,
    load_pipeline: Pipeline<LoadState>,
    clock: VersionClock,
}

impl CollectionManager {
    /// Builds the manager and its pipelines over the given collaborators.
    pub fn new(store: Arc<dyn VersionStore>, index: Arc<dyn UniquenessIndex>) -> Self {
        let write_pipeline = Pipeline::new()
            .with_stage(ValidateWrite)
            .with_stage(VerifyUniqueFields::new(Arc::clone(&index)))
            .with_stage(VerifyExpectedVersion::new(Arc::clone(&store)))
            .with_stage(MarkStart::new(Arc::clone(&store)))
            .with_stage(VerifyWriteExclusive::new(Arc::clone(&store)))
            .with_stage(MarkCommit::new(Arc::clone(&store)));

        let delete_pipeline = Pipeline::new()
            .with_stage(ValidateDelete)
            .with_stage(VerifyDeleteTarget::new(Arc::clone(&store)))
            .with_stage(MarkTombstone::new(Arc::clone(&store), Arc::clone(&index)));

        let load_pipeline = Pipeline::new()
            .with_stage(ValidateLoad)
            .with_stage(LoadVersion::new(store));

        Self {
            write_pipeline,
            delete_pipeline,
            load_pipeline,
            clock: VersionClock::new(),
        }
    }

    /// Creates or updates an entity. Returns the committed record, whose
    /// stamp is the entity's new version.
    pub async fn write(
        &self,
        scope: &CollectionScope,
        request: WriteRequest,
    ) -> PipelineResult<VersionedRecord> {
        let record = VersionedRecord::partial(request.entity, self.clock.next());
        let event = PipelineEvent::new(scope.clone(), WriteState::new(record, request.expected));
        let done = self.write_pipeline.execute(event).await?;
        Ok(done.payload.record)
    }

    /// Deletes an entity by appending a tombstone version. With `expected`,
    /// the delete commits only if that stamp is still the latest committed
    /// version.
    pub async fn delete(
        &self,
        scope: &CollectionScope,
        id: EntityId,
        expected: Option<VersionStamp>,
    ) -> PipelineResult<VersionedRecord> {
        let tombstone = VersionedRecord::tombstone(id, self.clock.next());
        let event = PipelineEvent::new(scope.clone(), DeleteState::new(tombstone, expected));
        let done = self.delete_pipeline.execute(event).await?;
        Ok(done.payload.record)
    }

    /// Reads the visible version of an entity: the latest committed one, or
    /// the newest committed at or below `at` for a snapshot read.
    pub async fn load(
        &self,
        scope: &CollectionScope,
        id: EntityId,
        at: Option<VersionStamp>,
    ) -> PipelineResult<VersionedRecord> {
        let event = PipelineEvent::new(scope.clone(), LoadState::new(id.clone(), at));
        let done = self.load_pipeline.execute(event).await?;
        done.payload.record.ok_or(PipelineError::NotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryUniquenessIndex;
    use crate::storage::InMemoryVersionStore;
    use serde_json::json;
    use uuid::Uuid;

    fn manager() -> CollectionManager {
        CollectionManager::new(
            Arc::new(InMemoryVersionStore::new()),
            Arc::new(InMemoryUniquenessIndex::new()),
        )
    }

    fn scope() -> CollectionScope {
        CollectionScope::new(Uuid::new_v4(), "users")
    }

    fn entity(name: &str) -> Entity {
        let mut entity = Entity::new(EntityId::generate("user"));
        entity.set_field("name", json!(name));
        entity
    }

    #[tokio::test]
    async fn test_write_then_load_round_trip() {
        let manager = manager();
        let scope = scope();
        let content = entity("x");
        let id = content.id().clone();

        let written = manager
            .write(&scope, WriteRequest::new(content))
            .await
            .unwrap();
        let loaded = manager.load(&scope, id, None).await.unwrap();

        assert_eq!(loaded, written);
        assert_eq!(loaded.entity().unwrap().field("name"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn test_load_unknown_entity_is_not_found() {
        let manager = manager();
        let result = manager.load(&scope(), EntityId::generate("user"), None).await;

        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_requires_existing_entity() {
        let manager = manager();
        let result = manager
            .delete(&scope(), EntityId::generate("user"), None)
            .await;

        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_write_pipeline_has_six_stages() {
        let manager = manager();
        assert_eq!(manager.write_pipeline.stage_count(), 6);
        assert_eq!(manager.delete_pipeline.stage_count(), 3);
        assert_eq!(manager.load_pipeline.stage_count(), 2);
    }
}
