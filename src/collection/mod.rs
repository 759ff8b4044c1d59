//! Entity Collections
//!
//! A collection is the logical namespace entities belong to, analogous to a
//! table. `CollectionScope` travels with every pipeline event and supplies
//! collection-level settings to stages; stages read it and never mutate it.
//! `CollectionManager` is the public entry point for mutations and reads.

mod manager;

pub use manager::{CollectionManager, WriteRequest};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consistency level requested from the storage backend for a collection.
///
/// Passed through to the store with every call; the in-memory store ignores
/// it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// Acknowledge after a single replica.
    One,
    /// Acknowledge after a majority of replicas.
    #[default]
    Quorum,
}

/// The logical namespace a versioned entity belongs to.
///
/// Carries the owning application, the collection name, the set of fields
/// declared unique within the collection, and the consistency level for
/// storage calls. Constructed per caller, read-only for stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionScope {
    owner: Uuid,
    name: String,
    unique_fields: Vec<String>,
    consistency: ConsistencyLevel,
}

impl CollectionScope {
    /// Creates a scope with no unique fields and the default consistency.
    pub fn new(owner: Uuid, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            unique_fields: Vec::new(),
            consistency: ConsistencyLevel::default(),
        }
    }

    /// Declares a field unique within this collection.
    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    /// Sets the consistency level for storage calls.
    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = consistency;
        self
    }

    /// Returns the owning application id.
    #[inline]
    pub fn owner(&self) -> Uuid {
        self.owner
    }

    /// Returns the collection name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields declared unique within this collection.
    #[inline]
    pub fn unique_fields(&self) -> &[String] {
        &self.unique_fields
    }

    /// Returns the consistency level for storage calls.
    #[inline]
    pub fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_defaults() {
        let scope = CollectionScope::new(Uuid::new_v4(), "users");

        assert_eq!(scope.name(), "users");
        assert!(scope.unique_fields().is_empty());
        assert_eq!(scope.consistency(), ConsistencyLevel::Quorum);
    }

    #[test]
    fn test_scope_builder() {
        let scope = CollectionScope::new(Uuid::new_v4(), "users")
            .with_unique_field("email")
            .with_unique_field("handle")
            .with_consistency(ConsistencyLevel::One);

        assert_eq!(scope.unique_fields(), ["email", "handle"]);
        assert_eq!(scope.consistency(), ConsistencyLevel::One);
    }
}
