//! EntityId - Logical entity identity
//!
//! An entity keeps a single identifier across all of its versions. The
//! identifier pairs a UUID with a kind string ("user", "device", ...), so
//! identity is scoped by kind rather than by UUID alone.
//!
//! This is a pure type. The validity predicate (non-nil UUID, non-empty
//! non-blank kind) is enforced by `pipeline::validate`, not here.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable logical identity of an entity across all of its versions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    uuid: Uuid,
    kind: String,
}

impl EntityId {
    /// Creates an identifier from its parts.
    ///
    /// No validation happens here; malformed identifiers are rejected by the
    /// pipeline validation contract.
    pub fn new(uuid: Uuid, kind: impl Into<String>) -> Self {
        Self {
            uuid,
            kind: kind.into(),
        }
    }

    /// Creates a fresh identifier for a new entity of the given kind.
    pub fn generate(kind: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), kind)
    }

    /// Returns the UUID component.
    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the kind component.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accessors() {
        let uuid = Uuid::new_v4();
        let id = EntityId::new(uuid, "user");

        assert_eq!(id.uuid(), uuid);
        assert_eq!(id.kind(), "user");
    }

    #[test]
    fn test_generate_produces_distinct_ids() {
        let a = EntityId::generate("user");
        let b = EntityId::generate("user");

        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_includes_kind() {
        let uuid = Uuid::new_v4();
        let user = EntityId::new(uuid, "user");
        let device = EntityId::new(uuid, "device");

        assert_ne!(user, device);
    }

    #[test]
    fn test_display_contains_both_parts() {
        let id = EntityId::new(Uuid::nil(), "user");
        let shown = id.to_string();

        assert!(shown.starts_with("user/"));
        assert!(shown.contains("00000000"));
    }

    #[test]
    fn test_serde_round_trip() {
        let id = EntityId::generate("order");
        let json = serde_json::to_string(&id).unwrap();
        let back: EntityId = serde_json::from_str(&json).unwrap();

        assert_eq!(id, back);
    }
}
