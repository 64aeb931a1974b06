// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod alerts;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod persist;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::{ReportItem, SourceFetcher};
pub use crate::notify::{NoopSink, ReportSink};
pub use crate::pipeline::{run_digest, RunOutcome};
pub use crate::report::{Aggregator, RunResult};
pub use crate::sources::{SourceDescriptor, SourceKind};
