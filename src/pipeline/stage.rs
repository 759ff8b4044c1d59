//! Stage contract and pipeline composition
//!
//! A stage is a single-purpose, fallible transformation of a pipeline
//! event. Pipelines are assembled once at service construction and executed
//! strictly in assembly order: no stage runs before its predecessor
//! completes, no stage is skipped or reordered at runtime. Across events
//! there is no ordering at all; pipelines for different entities interleave
//! freely at their storage-call suspension points.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::observability::{Logger, Severity};

use super::errors::PipelineResult;
use super::event::PipelineEvent;

/// Boxed future returned by a stage.
pub type StageFuture<'a, T> =
    Pin<Box<dyn Future<Output = PipelineResult<PipelineEvent<T>>> + Send + 'a>>;

/// A single-purpose pipeline stage.
///
/// Implementations must invoke the validation contract before any
/// stage-specific work, so rejection of malformed input is identical at
/// every pipeline position.
pub trait Stage<T>: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// Validates the event, performs this stage's effect, and returns the
    /// (possibly transformed) event for the next stage.
    fn apply<'a>(&'a self, event: PipelineEvent<T>) -> StageFuture<'a, T>;
}

/// An ordered, immutable sequence of stages for one operation kind.
pub struct Pipeline<T> {
    stages: Vec<Arc<dyn Stage<T>>>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage. Assembly happens once, at service construction.
    pub fn with_stage(mut self, stage: impl Stage<T> + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Returns the number of stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the event through every stage in order. The first failure
    /// aborts the remainder and is returned unchanged.
    pub async fn execute(&self, mut event: PipelineEvent<T>) -> PipelineResult<PipelineEvent<T>> {
        for stage in &self.stages {
            event = match stage.apply(event).await {
                Ok(next) => next,
                Err(err) => {
                    let detail = err.to_string();
                    Logger::log_stderr(
                        Severity::Warn,
                        "stage_failed",
                        &[("stage", stage.name()), ("detail", &detail)],
                    );
                    return Err(err);
                }
            };
        }
        Ok(event)
    }
}

impl<T: Send + 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionScope;
    use crate::pipeline::errors::PipelineError;
    use uuid::Uuid;

    /// Pass-through stage that counts invocations.
    struct Counting(Arc<std::sync::atomic::AtomicUsize>);

    impl Stage<u32> for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply<'a>(&'a self, event: PipelineEvent<u32>) -> StageFuture<'a, u32> {
            Box::pin(async move {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(event)
            })
        }
    }

    /// Stage that always fails.
    struct Failing;

    impl Stage<u32> for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply<'a>(&'a self, event: PipelineEvent<u32>) -> StageFuture<'a, u32> {
            Box::pin(async move {
                let _ = event;
                Err(PipelineError::RequiredFieldMissing { field: "payload" })
            })
        }
    }

    fn event() -> PipelineEvent<u32> {
        PipelineEvent::new(CollectionScope::new(Uuid::new_v4(), "users"), 0)
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_event_through() {
        let pipeline: Pipeline<u32> = Pipeline::new();
        assert_eq!(pipeline.stage_count(), 0);

        let out = pipeline.execute(event()).await.unwrap();
        assert_eq!(out.payload, 0);
    }

    #[tokio::test]
    async fn test_stages_run_in_assembly_order() {
        struct Push(u32);
        impl Stage<Vec<u32>> for Push {
            fn name(&self) -> &'static str {
                "push"
            }
            fn apply<'a>(&'a self, mut event: PipelineEvent<Vec<u32>>) -> StageFuture<'a, Vec<u32>> {
                Box::pin(async move {
                    event.payload.push(self.0);
                    Ok(event)
                })
            }
        }

        let pipeline = Pipeline::new()
            .with_stage(Push(1))
            .with_stage(Push(2))
            .with_stage(Push(3));

        let seed = PipelineEvent::new(CollectionScope::new(Uuid::new_v4(), "users"), Vec::new());
        let out = pipeline.execute(seed).await.unwrap();
        assert_eq!(out.payload, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_stages() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_stage(Failing)
            .with_stage(Counting(Arc::clone(&calls)));

        let result = pipeline.execute(event()).await;
        assert!(matches!(
            result,
            Err(PipelineError::RequiredFieldMissing { field: "payload" })
        ));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_error_is_returned_unchanged() {
        let pipeline: Pipeline<u32> = Pipeline::new().with_stage(Failing);
        let err = pipeline.execute(event()).await.unwrap_err();
        assert!(err.is_contract_violation());
    }
}
