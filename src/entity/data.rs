//! Entity - entity field content
//!
//! The inner content carried by a versioned record: the entity's own
//! identifier plus a JSON field map. The identifier is repeated here on
//! purpose - the validation contract cross-checks it against the wrapping
//! record's identifier before any stage runs its own logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityId;

/// Entity content: an identifier plus named JSON fields.
///
/// Fields are kept in a sorted map so serialized forms are deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no fields.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Creates an entity with initial fields.
    pub fn with_fields(id: EntityId, fields: BTreeMap<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Returns the entity's own identifier.
    #[inline]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns all fields.
    #[inline]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Returns a single field value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field value, replacing any previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_starts_empty() {
        let entity = Entity::new(EntityId::generate("user"));
        assert!(entity.fields().is_empty());
        assert!(entity.field("name").is_none());
    }

    #[test]
    fn test_set_and_read_field() {
        let mut entity = Entity::new(EntityId::generate("user"));
        entity.set_field("name", json!("x"));

        assert_eq!(entity.field("name"), Some(&json!("x")));
    }

    #[test]
    fn test_set_field_replaces() {
        let mut entity = Entity::new(EntityId::generate("user"));
        entity.set_field("name", json!("x"));
        entity.set_field("name", json!("y"));

        assert_eq!(entity.field("name"), Some(&json!("y")));
        assert_eq!(entity.fields().len(), 1);
    }

    #[test]
    fn test_serialized_field_order_is_deterministic() {
        let id = EntityId::generate("user");
        let mut a = Entity::new(id.clone());
        a.set_field("b", json!(2));
        a.set_field("a", json!(1));

        let mut b = Entity::new(id);
        b.set_field("a", json!(1));
        b.set_field("b", json!(2));

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
