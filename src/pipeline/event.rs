//! Pipeline event envelope
//!
//! Couples a collection scope with the payload a stage sequence operates
//! on. Each submission constructs a fresh event; events are moved from
//! stage to stage, never shared for concurrent mutation.

use crate::collection::CollectionScope;

/// The unit of flow through a pipeline: a scope plus a stage-set-specific
/// payload (write state, delete state, or load state).
#[derive(Clone, Debug)]
pub struct PipelineEvent<T> {
    /// The collection the payload belongs to. Read-only for stages.
    pub scope: CollectionScope,
    /// The stage-set-specific payload; stages may transform it.
    pub payload: T,
}

impl<T> PipelineEvent<T> {
    /// Creates a fresh event for one submission.
    pub fn new(scope: CollectionScope, payload: T) -> Self {
        Self { scope, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_event_carries_scope_and_payload() {
        let scope = CollectionScope::new(Uuid::new_v4(), "users");
        let event = PipelineEvent::new(scope.clone(), 42u32);

        assert_eq!(event.scope, scope);
        assert_eq!(event.payload, 42);
    }
}
