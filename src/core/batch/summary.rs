//! Batch summary and reporting
//!
//! This module defines structures for tracking and reporting what a batch
//! did to a record set.

use crate::domain::{PatientStatus, RecordErrorDetail};
use std::time::Duration;
use uuid::Uuid;

/// Summary of one orchestration call
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Identifier of this run, attached to its log lines
    pub run_id: Uuid,

    /// Number of records in the set
    pub total_records: usize,

    /// Records submitted for the first time
    pub submitted: usize,

    /// Records given a resolution pass
    pub resolution_attempts: usize,

    /// Records that received a pseudonym in this run
    pub pseudonymized: usize,

    /// Records whose medical data was stored
    pub synced: usize,

    /// Records whose medical data could not be stored
    pub sync_failed: usize,

    /// Whether the medical-data exchange was skipped
    pub dry_run: bool,

    /// Whether a shutdown signal cut the run short
    pub cancelled: bool,

    /// Record count per status at the end of the run
    pub status_counts: Vec<(PatientStatus, usize)>,

    /// Duration of the run
    pub duration: Duration,

    /// Per-record errors
    pub errors: Vec<RecordErrorDetail>,
}

impl BatchSummary {
    /// Create a new empty summary
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            total_records: 0,
            submitted: 0,
            resolution_attempts: 0,
            pseudonymized: 0,
            synced: 0,
            sync_failed: 0,
            dry_run: false,
            cancelled: false,
            status_counts: Vec::new(),
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: RecordErrorDetail) {
        self.errors.push(error);
    }

    /// Number of records currently in the given status
    pub fn count(&self, status: PatientStatus) -> usize {
        self.status_counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Number of records left in a failure state
    pub fn failed(&self) -> usize {
        self.status_counts
            .iter()
            .filter(|(s, _)| s.is_failure())
            .map(|(_, n)| n)
            .sum()
    }

    /// Check if every record ended without failure
    pub fn is_successful(&self) -> bool {
        !self.cancelled && self.failed() == 0 && self.sync_failed == 0 && self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            total_records = self.total_records,
            submitted = self.submitted,
            resolution_attempts = self.resolution_attempts,
            pseudonymized = self.pseudonymized,
            failed = self.failed(),
            synced = self.synced,
            sync_failed = self.sync_failed,
            dry_run = self.dry_run,
            cancelled = self.cancelled,
            duration_ms = self.duration.as_millis() as u64,
            "Batch summary"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                run_id = %self.run_id,
                error_count = self.errors.len(),
                "Batch completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    record_key = error.record_key.as_deref().unwrap_or("-"),
                    http_status = error.status,
                    message = %error.message,
                    "Record error"
                );
            }
        }
    }
}
