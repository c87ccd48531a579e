//! Pseudonymize command implementation
//!
//! This module implements the `pseudonymize` command, which runs a record
//! set through the pseudonymization protocol and sends its medical data.

use crate::cli::records::{read_record_set, write_json};
use crate::config::load_config;
use crate::core::batch::BatchOrchestrator;
use crate::domain::PatientStatus;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the pseudonymize command
#[derive(Args, Debug)]
pub struct PseudonymizeArgs {
    /// Record set to pseudonymize (JSON array of records)
    #[arg(short, long)]
    pub input: String,

    /// Where to write the updated record set (defaults to the input file)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Send medical data again for records that were already synced
    #[arg(long)]
    pub retry_succeeded: bool,

    /// Pseudonymize, but don't send medical data
    #[arg(long)]
    pub dry_run: bool,
}

impl PseudonymizeArgs {
    /// Execute the pseudonymize command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input, "Starting pseudonymize command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        let retry_succeeded = self.retry_succeeded || config.pseudonymization.retry_succeeded;

        let mut records = match read_record_set(&self.input) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(input = %self.input, error = %e, "Failed to read record set");
                eprintln!("Failed to read record set {}: {e}", self.input);
                return Ok(2);
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No medical data will be sent");
            println!();
        }

        let orchestrator = match BatchOrchestrator::from_config(&config, shutdown_signal) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create orchestrator");
                eprintln!("Failed to initialize pseudonymization: {e}");
                return Ok(2);
            }
        };

        println!("🚀 Pseudonymizing {} record(s)...", records.len());
        println!();

        let result = orchestrator.send_records(&mut records, retry_succeeded).await;

        // Transitions applied before a failure must not be lost
        let output = self.output.as_deref().unwrap_or(&self.input);
        write_json(output, &records)?;
        tracing::info!(output = %output, "Record set written");

        let summary = match result {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Pseudonymization failed");
                eprintln!("Pseudonymization failed: {e}");
                eprintln!("Progress saved to {output}. Run the same command to resume.");
                return Ok(5);
            }
        };

        println!("📊 Pseudonymization Summary:");
        println!("  Run ID: {}", summary.run_id);
        println!("  Total Records: {}", summary.total_records);
        println!("  Submitted: {}", summary.submitted);
        println!("  Resolution Attempts: {}", summary.resolution_attempts);
        println!("  Pseudonymized: {}", summary.pseudonymized);
        println!("  Medical Data Stored: {}", summary.synced);
        println!("  Medical Data Failed: {}", summary.sync_failed);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();
        println!("  {:<16} {:>8}", "Status", "Count");
        for status in PatientStatus::ALL {
            let count = summary.count(status);
            if count > 0 {
                println!("  {:<16} {:>8}", status.as_str(), count);
            }
        }
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in summary.errors.iter().take(10) {
                println!(
                    "  - {}: {}",
                    error.record_key.as_deref().unwrap_or("batch"),
                    error.message
                );
            }
            if summary.errors.len() > 10 {
                println!("  ... and {} more errors", summary.errors.len() - 10);
            }
            println!();
        }

        let exit_code = if summary.cancelled {
            println!("⚠️  Pseudonymization interrupted. Progress saved to {output}.");
            tracing::info!("Pseudonymization interrupted by user signal");
            130
        } else if summary.is_successful() {
            println!("✅ Pseudonymization completed successfully!");
            0
        } else {
            println!("⚠️  Pseudonymization completed with failures");
            1
        };

        Ok(exit_code)
    }
}
