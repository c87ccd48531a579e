//! Conflict resolver
//!
//! Gives records left in a failure state one more submission. Records that
//! still hold their token are resubmitted with it; all others get a fresh
//! token first. Identities rejected as invalid are only resubmitted after the
//! caller amended the identity or its sureness.

use super::broker::TokenBroker;
use super::engine::{PseudonymizationEngine, TokenAssignment};
use crate::domain::{PatientStatus, RecordErrorDetail, RecordKey, RecordSet, Result};
use std::collections::HashSet;
use tokio::sync::watch;

/// Result of one resolution pass
#[derive(Debug, Default)]
pub struct ResolutionOutcome {
    /// Records that received a pseudonym in this pass
    pub pseudonymized: Vec<RecordKey>,
    /// Records still without a pseudonym, in input order
    pub unresolved: Vec<RecordKey>,
    /// Replies outside the defined outcomes
    pub errors: Vec<RecordErrorDetail>,
    /// Whether a shutdown signal cut the pass short
    pub cancelled: bool,
}

/// Runs a single resolution pass over failed records
#[derive(Clone)]
pub struct ConflictResolver {
    broker: TokenBroker,
    engine: PseudonymizationEngine,
}

impl ConflictResolver {
    /// Creates a resolver
    pub fn new(broker: TokenBroker, engine: PseudonymizationEngine) -> Self {
        Self { broker, engine }
    }

    /// Resubmits the given records once
    ///
    /// Keys of records that already hold a pseudonym are ignored. The pass
    /// always terminates after at most one submission per record.
    ///
    /// # Errors
    ///
    /// Fails if fresh tokens cannot be acquired or the service becomes
    /// unreachable.
    pub async fn resolve(
        &self,
        records: &mut RecordSet,
        keys: &[RecordKey],
        shutdown: watch::Receiver<bool>,
    ) -> Result<ResolutionOutcome> {
        let mut retained = Vec::new();
        let mut needs_token = Vec::new();
        let mut candidates = Vec::new();
        let mut skipped_invalid = 0usize;

        for key in keys {
            let Some(record) = records.get(key) else {
                tracing::warn!(record_key = %key, "Skipping unknown record in resolution pass");
                continue;
            };

            match record.status() {
                PatientStatus::IdatInvalid if !record.is_amended() => {
                    skipped_invalid += 1;
                    candidates.push(key.clone());
                }
                PatientStatus::IdatInvalid | PatientStatus::IdatConflict => {
                    candidates.push(key.clone());
                    match record.active_token() {
                        Some(token) => retained.push(TokenAssignment::new(
                            key.clone(),
                            token.clone(),
                            record.token_uses_callback().unwrap_or(false),
                        )),
                        None => needs_token.push(key.clone()),
                    }
                }
                PatientStatus::TokenInvalid | PatientStatus::Created => {
                    candidates.push(key.clone());
                    needs_token.push(key.clone());
                }
                PatientStatus::Pseudonymized
                | PatientStatus::Processed
                | PatientStatus::NotProcessed
                | PatientStatus::Found
                | PatientStatus::NotFound => {}
            }
        }

        tracing::info!(
            candidates = candidates.len(),
            retained_tokens = retained.len(),
            fresh_tokens = needs_token.len(),
            skipped_invalid = skipped_invalid,
            "Starting resolution pass"
        );

        let mut assignments = retained;
        if !needs_token.is_empty() {
            let issued = self.broker.acquire_create_tokens(needs_token.len()).await?;
            assignments.extend(
                needs_token
                    .into_iter()
                    .zip(issued.tokens)
                    .map(|(key, token)| TokenAssignment::new(key, token, issued.use_callback)),
            );
        }

        let report = self
            .engine
            .pseudonymize_batch(records, assignments, shutdown)
            .await?;

        let done: HashSet<&RecordKey> = report.pseudonymized.iter().collect();
        let unresolved = candidates
            .iter()
            .filter(|key| !done.contains(key))
            .cloned()
            .collect();

        Ok(ResolutionOutcome {
            unresolved,
            pseudonymized: report.pseudonymized,
            errors: report.errors,
            cancelled: report.cancelled,
        })
    }
}
