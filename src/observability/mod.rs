//! Observability
//!
//! Structured logging for pipeline and storage events.

mod logger;

pub use logger::{Logger, Severity};
