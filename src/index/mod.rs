//! Uniqueness Index
//!
//! Collaborator enforcing declared-unique field values within a collection.
//! The production implementation lives next to the storage backend; the
//! pipeline only needs claim/release, and `InMemoryUniquenessIndex` provides
//! both for tests and embedding.
//!
//! A claim is idempotent for its owner: re-claiming a value an entity
//! already holds succeeds, so updates that keep a unique value do not
//! collide with themselves.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use crate::collection::CollectionScope;
use crate::entity::EntityId;
use crate::storage::{StoreError, StoreFuture};

/// Contract the pipeline requires from the uniqueness index.
pub trait UniquenessIndex: Send + Sync {
    /// Claims `value` for `field` on behalf of `owner`, scoped to the
    /// collection. Returns the current owner when the value is already
    /// claimed by a different entity; None means the claim is held by
    /// `owner` after the call.
    fn claim<'a>(
        &'a self,
        scope: &'a CollectionScope,
        field: &'a str,
        value: &'a Value,
        owner: &'a EntityId,
    ) -> StoreFuture<'a, Option<EntityId>>;

    /// Releases every claim held by `owner` in the collection. Used by the
    /// delete path so a deleted entity's unique values become reusable.
    fn release_owner<'a>(
        &'a self,
        scope: &'a CollectionScope,
        owner: &'a EntityId,
    ) -> StoreFuture<'a, ()>;
}

type ClaimKey = (Uuid, String, String, String);

/// In-memory uniqueness index for tests and embedding.
#[derive(Default)]
pub struct InMemoryUniquenessIndex {
    claims: RwLock<HashMap<ClaimKey, EntityId>>,
}

impl InMemoryUniquenessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &CollectionScope, field: &str, value: &Value) -> ClaimKey {
        (
            scope.owner(),
            scope.name().to_string(),
            field.to_string(),
            value.to_string(),
        )
    }
}

impl UniquenessIndex for InMemoryUniquenessIndex {
    fn claim<'a>(
        &'a self,
        scope: &'a CollectionScope,
        field: &'a str,
        value: &'a Value,
        owner: &'a EntityId,
    ) -> StoreFuture<'a, Option<EntityId>> {
        Box::pin(async move {
            let mut claims = self
                .claims
                .write()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            match claims.entry(Self::key(scope, field, value)) {
                std::collections::hash_map::Entry::Occupied(taken) => {
                    if taken.get() == owner {
                        Ok(None)
                    } else {
                        Ok(Some(taken.get().clone()))
                    }
                }
                std::collections::hash_map::Entry::Vacant(free) => {
                    free.insert(owner.clone());
                    Ok(None)
                }
            }
        })
    }

    fn release_owner<'a>(
        &'a self,
        scope: &'a CollectionScope,
        owner: &'a EntityId,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut claims = self
                .claims
                .write()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            claims.retain(|(app, collection, _, _), claim_owner| {
                !(*app == scope.owner()
                    && collection.as_str() == scope.name()
                    && *claim_owner == *owner)
            });
            Ok(())
        })
    }
}
