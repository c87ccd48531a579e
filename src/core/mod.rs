//! Core business logic for the pseudonymizer.
//!
//! # Modules
//!
//! - [`pseudonymization`] - Token acquisition, identity submission and conflict resolution
//! - [`depseudonymization`] - Resolving pseudonyms back to identifying data
//! - [`batch`] - Record-set orchestration and summaries
//!
//! # Send Workflow
//!
//! 1. **Partition**: Split the record set by status
//! 2. **Issue**: Acquire one token per `Created` record
//! 3. **Submit**: Redeem the tokens with the records' identifying data
//! 4. **Resolve**: Give records in a failure state one more submission
//! 5. **Store**: Send the medical data of pseudonymized records
//! 6. **Report**: Generate a batch summary
//!
//! # Example
//!
//! ```rust,no_run
//! use pseudonymizer::config::load_config;
//! use pseudonymizer::core::batch::BatchOrchestrator;
//! use pseudonymizer::domain::RecordSet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pseudonymizer.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let orchestrator = BatchOrchestrator::from_config(&config, shutdown_rx)?;
//!
//! let mut records = RecordSet::new();
//! let summary = orchestrator.send_records(&mut records, false).await?;
//!
//! println!("Pseudonymized: {}", summary.pseudonymized);
//! println!("Synced: {}", summary.synced);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod depseudonymization;
pub mod pseudonymization;
