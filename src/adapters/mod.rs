//! External system integrations for the pseudonymizer.
//!
//! - [`linkage`] - Record-linkage service (token issuance, identity submission and reads)
//! - [`storage`] - Medical-data store keyed by pseudonym
//! - [`retry`] - Backoff shared by the idempotent requests of both
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the protocol
//! engines can be tested against in-process fakes.
//!
//! ```rust,no_run
//! use pseudonymizer::adapters::linkage::LinkageClient;
//! use pseudonymizer::adapters::storage::create_medical_data_store;
//! use pseudonymizer::config::{LinkageConfig, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let linkage = LinkageClient::new(LinkageConfig::default())?;
//! linkage.health_check().await?;
//!
//! let store = create_medical_data_store(&StorageConfig::default())?;
//! println!("Storing medical data via {}", store.backend_name());
//! # Ok(())
//! # }
//! ```

pub mod linkage;
pub mod retry;
pub mod storage;
