//! Batch orchestration and reporting
//!
//! This module provides the record-set level entry points:
//! - Sending a record set (pseudonymize, resolve, store medical data)
//! - Requesting records for a list of pseudonyms
//! - Summary and reporting

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{BatchOrchestrator, OrchestratorOptions, RequestOutcome};
pub use summary::BatchSummary;
