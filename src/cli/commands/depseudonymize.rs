//! Depseudonymize command implementation
//!
//! This module implements the `depseudonymize` command, which resolves a
//! list of pseudonyms to identities and fetches their medical data.

use crate::cli::records::{read_pseudonyms, write_json};
use crate::config::load_config;
use crate::core::batch::{BatchOrchestrator, RequestOutcome};
use crate::domain::{PatientStatus, Pseudonym, RecordSet};
use clap::Args;
use serde::Serialize;
use tokio::sync::watch;

/// Arguments for the depseudonymize command
#[derive(Args, Debug)]
pub struct DepseudonymizeArgs {
    /// Pseudonyms to resolve (JSON array of strings)
    #[arg(short, long)]
    pub input: String,

    /// Where to write the result (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Serialize)]
struct DepseudonymizeReport<'a> {
    records: &'a RecordSet,
    invalid: &'a [Pseudonym],
    unresolved: &'a [Pseudonym],
}

impl<'a> From<&'a RequestOutcome> for DepseudonymizeReport<'a> {
    fn from(outcome: &'a RequestOutcome) -> Self {
        Self {
            records: &outcome.records,
            invalid: &outcome.invalid,
            unresolved: &outcome.unresolved,
        }
    }
}

impl DepseudonymizeArgs {
    /// Execute the depseudonymize command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input, "Starting depseudonymize command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let pseudonyms = match read_pseudonyms(&self.input) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(input = %self.input, error = %e, "Failed to read pseudonyms");
                eprintln!("Failed to read pseudonyms {}: {e}", self.input);
                return Ok(2);
            }
        };

        let orchestrator = match BatchOrchestrator::from_config(&config, shutdown_signal) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create orchestrator");
                eprintln!("Failed to initialize depseudonymization: {e}");
                return Ok(2);
            }
        };

        let outcome = match orchestrator.request_records(&pseudonyms).await {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Depseudonymization failed");
                eprintln!("Depseudonymization failed: {e}");
                return Ok(5);
            }
        };

        let report = DepseudonymizeReport::from(&outcome);
        match &self.output {
            Some(path) => {
                write_json(path, &report)?;
                tracing::info!(output = %path, "Depseudonymization result written");
            }
            None => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        let found = outcome
            .records
            .iter()
            .filter(|r| r.status() == PatientStatus::Found)
            .count();

        eprintln!();
        eprintln!("📊 Depseudonymization Summary:");
        eprintln!("  Requested: {}", pseudonyms.len());
        eprintln!("  Resolved: {}", outcome.records.len());
        eprintln!("  Medical Data Found: {found}");
        eprintln!("  Invalid: {}", outcome.invalid.len());
        eprintln!("  Unresolved: {}", outcome.unresolved.len());

        let exit_code = if outcome.invalid.is_empty() && outcome.unresolved.is_empty() {
            0
        } else {
            1
        };

        Ok(exit_code)
    }
}
