//! Batch orchestrator - entry point for whole record sets
//!
//! Partitions a record set by status, routes each partition to the right
//! protocol step and exchanges medical data for the records that hold a
//! pseudonym.

use crate::adapters::linkage::{LinkageClient, RecordLinkageService};
use crate::adapters::storage::{create_medical_data_store, MedicalDataEntry, MedicalDataStore};
use crate::config::PseudonymizerConfig;
use crate::core::batch::summary::BatchSummary;
use crate::core::depseudonymization::{dedup_pseudonyms, DepseudonymizationEngine};
use crate::core::pseudonymization::{
    ConflictResolver, PseudonymizationEngine, TokenAssignment, TokenBroker,
};
use crate::domain::{
    PatientRecord, PatientStatus, Pseudonym, PseudonymizerError, RecordErrorDetail, RecordKey,
    RecordSet, Result, StatusPartition,
};
use crate::log_batch_complete;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// Orchestrator settings
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Maximum number of identity submissions in flight
    pub max_concurrency: usize,
    /// Skip the medical-data send
    pub dry_run: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            dry_run: false,
        }
    }
}

/// Records, keyed by pseudonym, returned by a lookup
#[derive(Debug, Clone, Default)]
pub struct RequestOutcome {
    /// One record per matched pseudonym, in `Found` or `NotFound`
    pub records: RecordSet,
    /// Pseudonyms the service does not know
    pub invalid: Vec<Pseudonym>,
    /// Pseudonyms that could not be resolved
    pub unresolved: Vec<Pseudonym>,
}

/// Batch orchestrator
pub struct BatchOrchestrator {
    broker: TokenBroker,
    engine: PseudonymizationEngine,
    resolver: ConflictResolver,
    depseudonymizer: DepseudonymizationEngine,
    store: Arc<dyn MedicalDataStore>,
    options: OrchestratorOptions,
    shutdown: watch::Receiver<bool>,
}

impl BatchOrchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        service: Arc<dyn RecordLinkageService>,
        store: Arc<dyn MedicalDataStore>,
        options: OrchestratorOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let broker = TokenBroker::new(Arc::clone(&service));
        let engine = PseudonymizationEngine::new(Arc::clone(&service), options.max_concurrency);
        let resolver = ConflictResolver::new(broker.clone(), engine.clone());
        let depseudonymizer = DepseudonymizationEngine::new(broker.clone(), service);

        Self {
            broker,
            engine,
            resolver,
            depseudonymizer,
            store,
            options,
            shutdown,
        }
    }

    /// Create an orchestrator wired to the services named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the linkage client or the store cannot be created.
    pub fn from_config(
        config: &PseudonymizerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let linkage = LinkageClient::new(config.linkage.clone())?;
        let store = create_medical_data_store(&config.storage)?;

        Ok(Self::new(
            linkage.service(),
            store,
            OrchestratorOptions {
                max_concurrency: config.pseudonymization.max_concurrency,
                dry_run: config.application.dry_run,
            },
            shutdown,
        ))
    }

    /// Pseudonymizes a record set and sends its medical data
    ///
    /// 1. `Created` records get fresh tokens and a first submission
    /// 2. Records in a failure state get one resolution pass
    /// 3. Records holding a pseudonym whose medical data is not stored yet,
    ///    plus those pseudonymized in steps 1 and 2, have their medical data
    ///    sent. With `retry_succeeded`, already-synced records are sent again.
    ///
    /// # Errors
    ///
    /// Token acquisition failures and an unreachable linkage service abort
    /// the batch. Transitions applied before the abort remain in `records`.
    pub async fn send_records(
        &self,
        records: &mut RecordSet,
        retry_succeeded: bool,
    ) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let mut summary = BatchSummary::new(Uuid::new_v4());
        summary.total_records = records.len();
        summary.dry_run = self.options.dry_run;

        let to_create = records.keys_where(|r| r.status().partition() == StatusPartition::ToCreate);
        let to_resolve =
            records.keys_where(|r| r.status().partition() == StatusPartition::ToResolve);
        let mut to_sync =
            records.keys_where(|r| r.status().partition() == StatusPartition::Pseudonymized);
        let synced = records.keys_where(|r| r.status().partition() == StatusPartition::Synced);

        tracing::info!(
            run_id = %summary.run_id,
            total = records.len(),
            to_create = to_create.len(),
            to_resolve = to_resolve.len(),
            pseudonymized = to_sync.len(),
            synced = synced.len(),
            retry_succeeded = retry_succeeded,
            "Starting send batch"
        );

        if !to_create.is_empty() {
            summary.submitted = to_create.len();
            let issued = self.broker.acquire_create_tokens(to_create.len()).await?;
            let assignments = to_create
                .into_iter()
                .zip(issued.tokens)
                .map(|(key, token)| TokenAssignment::new(key, token, issued.use_callback))
                .collect();

            let report = self
                .engine
                .pseudonymize_batch(records, assignments, self.shutdown.clone())
                .await?;

            summary.pseudonymized += report.pseudonymized.len();
            summary.errors.extend(report.errors);
            summary.cancelled |= report.cancelled;
            to_sync.extend(report.pseudonymized);
        }

        if !to_resolve.is_empty() && !summary.cancelled {
            summary.resolution_attempts = to_resolve.len();
            let outcome = self
                .resolver
                .resolve(records, &to_resolve, self.shutdown.clone())
                .await?;

            if !outcome.unresolved.is_empty() {
                tracing::info!(
                    run_id = %summary.run_id,
                    unresolved = outcome.unresolved.len(),
                    "Records left unresolved after resolution pass"
                );
            }

            summary.pseudonymized += outcome.pseudonymized.len();
            summary.errors.extend(outcome.errors);
            summary.cancelled |= outcome.cancelled;
            to_sync.extend(outcome.pseudonymized);
        }

        if retry_succeeded {
            to_sync.extend(synced);
        }

        if summary.cancelled {
            tracing::warn!(run_id = %summary.run_id, "Batch cancelled, medical data not sent");
        } else if self.options.dry_run {
            tracing::info!(
                run_id = %summary.run_id,
                pending = to_sync.len(),
                "Dry run - skipping medical-data send"
            );
        } else {
            self.sync_medical_data(records, &to_sync, &mut summary)
                .await?;
        }

        summary.status_counts = records.status_counts();
        let summary = summary.with_duration(start_time.elapsed());
        log_batch_complete!("send_records", summary.total_records, summary.duration);
        summary.log_summary();

        Ok(summary)
    }

    /// Sends the medical data of the given records as one batch
    async fn sync_medical_data(
        &self,
        records: &mut RecordSet,
        keys: &[RecordKey],
        summary: &mut BatchSummary,
    ) -> Result<()> {
        let entries: Vec<MedicalDataEntry> = keys
            .iter()
            .filter_map(|key| records.get(key))
            .filter_map(|record| {
                record
                    .pseudonym()
                    .map(|p| MedicalDataEntry::new(p.clone(), record.mdat().clone()))
            })
            .collect();

        if entries.is_empty() {
            return Ok(());
        }

        let stored = match self.store.store(&entries).await {
            Ok(()) => true,
            Err(PseudonymizerError::Storage(e)) => {
                tracing::error!(
                    run_id = %summary.run_id,
                    backend = self.store.backend_name(),
                    count = entries.len(),
                    error = %e,
                    "Failed to store medical data"
                );
                summary.add_error(
                    RecordErrorDetail::new(format!("medical data not stored: {e}")).retryable(),
                );
                false
            }
            Err(e) => return Err(e),
        };

        for key in keys {
            if let Some(record) = records.get_mut(key) {
                if record.pseudonym().is_some() {
                    record.mark_synced(stored)?;
                }
            }
        }

        if stored {
            summary.synced += entries.len();
        } else {
            summary.sync_failed += entries.len();
        }

        Ok(())
    }

    /// Looks up identities and medical data for a list of pseudonyms
    ///
    /// # Errors
    ///
    /// Fails if the read token cannot be acquired or redeemed, or the
    /// medical-data store cannot be queried.
    pub async fn request_records(&self, pseudonyms: &[Pseudonym]) -> Result<RequestOutcome> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4();

        tracing::info!(
            run_id = %run_id,
            requested = pseudonyms.len(),
            "Starting request batch"
        );

        let mut resolved = self.depseudonymizer.depseudonymize(pseudonyms).await?;

        let matched: Vec<Pseudonym> = dedup_pseudonyms(pseudonyms)
            .into_iter()
            .filter(|p| resolved.matches.contains_key(p))
            .collect();

        let payloads = if matched.is_empty() {
            Vec::new()
        } else {
            self.store.load(&matched).await?
        };

        let mut records = RecordSet::new();
        for (pseudonym, mdat) in matched.into_iter().zip(payloads) {
            let Some(identity) = resolved.matches.remove(&pseudonym) else {
                continue;
            };
            let found = mdat.is_some();

            let mut record = PatientRecord::builder()
                .key(pseudonym.as_str())?
                .idat(identity.idat)
                .mdat(mdat.unwrap_or_default())
                .pseudonymized(pseudonym, identity.tentative)
                .build()?;
            record.mark_lookup(found)?;
            records.insert(record)?;
        }

        let found = records
            .iter()
            .filter(|r| r.status() == PatientStatus::Found)
            .count();

        tracing::info!(
            run_id = %run_id,
            found = found,
            not_found = records.len() - found,
            invalid = resolved.invalid.len(),
            unresolved = resolved.unresolved.len(),
            "Request batch finished"
        );
        log_batch_complete!("request_records", records.len(), start_time.elapsed());

        Ok(RequestOutcome {
            records,
            invalid: resolved.invalid,
            unresolved: resolved.unresolved,
        })
    }
}
