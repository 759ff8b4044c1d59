//! Stage Pipeline
//!
//! Every mutation and read runs through an ordered sequence of
//! single-purpose stages. A stage validates its event first - the same
//! contract at every position, so malformed input is rejected identically
//! no matter where it enters - then performs one effect and hands the
//! (possibly transformed) event downstream. The first failure aborts the
//! rest of the pipeline for that event and no other.
//!
//! This module provides:
//! - `PipelineEvent` - Scope + payload envelope flowing through stages
//! - `Stage` / `Pipeline` - Stage contract and sequential composition
//! - `validate` - The shared precondition contract
//! - `write` / `delete` / `load` - The concrete stage sets

pub mod delete;
pub mod errors;
pub mod event;
pub mod load;
pub mod stage;
pub mod validate;
pub mod write;

pub use errors::{PipelineError, PipelineResult};
pub use event::PipelineEvent;
pub use stage::{Pipeline, Stage, StageFuture};
