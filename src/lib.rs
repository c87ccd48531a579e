// Pseudonymizer - Mainzelliste record-linkage client
// Copyright (c) 2025 Pseudonymizer Contributors
// Licensed under the MIT License

//! # Pseudonymizer - Mainzelliste record-linkage client
//!
//! Pseudonymizer drives the client side of a Mainzelliste-style record-linkage
//! service. It separates a patient's identifying data (IDAT) from their medical
//! data (MDAT): identities go to the linkage service in exchange for a
//! pseudonym, and only the pseudonym travels with the medical data.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Issuing** single-use request tokens from the token service
//! - **Pseudonymizing** identities by redeeming tokens, with bounded concurrency
//! - **Resolving** failed submissions in one extra pass
//! - **Depseudonymizing** pseudonyms back to identities with a read token
//! - **Exchanging** medical data keyed by pseudonym
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Protocol logic (pseudonymization, depseudonymization, batch orchestration)
//! - [`adapters`] - External integrations (Mainzelliste, medical-data store)
//! - [`domain`] - Core domain types and the record state machine
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pseudonymizer::config::load_config;
//! use pseudonymizer::core::batch::BatchOrchestrator;
//! use pseudonymizer::domain::{IdentifyingData, PatientRecord, RecordSet};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pseudonymizer.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let orchestrator = BatchOrchestrator::from_config(&config, shutdown_rx)?;
//!
//!     let mut records = RecordSet::new();
//!     records.insert(
//!         PatientRecord::builder()
//!             .key("row-1")?
//!             .idat(IdentifyingData::new(
//!                 "Erika",
//!                 "Mustermann",
//!                 NaiveDate::from_ymd_opt(1964, 8, 12).unwrap(),
//!             )?)
//!             .mdat(r#"{"diagnosis":"J45"}"#)
//!             .build()?,
//!     )?;
//!
//!     let summary = orchestrator.send_records(&mut records, false).await?;
//!     println!("Pseudonymized {} record(s)", summary.pseudonymized);
//!     Ok(())
//! }
//! ```
//!
//! ## Record Lifecycle
//!
//! Every [`domain::PatientRecord`] carries a [`domain::PatientStatus`]. A
//! record starts in `Created`, moves to `Pseudonymized` or one of the failure
//! states after a submission, and to `Processed`/`NotProcessed` once its
//! medical data has been sent. Calling
//! [`send_records`](core::batch::BatchOrchestrator::send_records) again on
//! the same set picks each record up where it stopped.
//!
//! ## Error Handling
//!
//! All library errors are [`domain::PseudonymizerError`]:
//!
//! ```rust,no_run
//! use pseudonymizer::domain::PseudonymizerError;
//!
//! fn example() -> Result<(), PseudonymizerError> {
//!     let config = pseudonymizer::config::load_config("pseudonymizer.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Structured logging with the `tracing` crate. Identifying data is never
//! logged; records appear by key and identity fingerprint.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
