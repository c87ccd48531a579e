//! Domain models and types for the pseudonymizer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RecordKey`], [`Pseudonym`], [`RequestToken`])
//! - **Validated identity** ([`IdentifyingData`], [`IdentityValidator`])
//! - **The record state machine** ([`PatientRecord`], [`PatientStatus`], [`RecordSet`])
//! - **Error types** ([`PseudonymizerError`], [`LinkageError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes so a caller key can never be confused with a
//! pseudonym:
//!
//! ```rust
//! use pseudonymizer::domain::{Pseudonym, RecordKey};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = RecordKey::new("row-1")?;
//! let pseudonym = Pseudonym::new("0003Y0WZ")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: RecordKey = pseudonym;
//! # Ok(())
//! # }
//! ```
//!
//! # Builder Pattern
//!
//! ```rust
//! use pseudonymizer::domain::{IdentifyingData, PatientRecord, PatientStatus};
//! use chrono::NaiveDate;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let record = PatientRecord::builder()
//!     .key("row-1")?
//!     .idat(IdentifyingData::new(
//!         "Erika",
//!         "Mustermann",
//!         NaiveDate::from_ymd_opt(1964, 8, 12).unwrap(),
//!     )?)
//!     .mdat(r#"{"diagnosis":"J45"}"#)
//!     .build()?;
//!
//! assert_eq!(record.status(), PatientStatus::Created);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod identity;
pub mod ids;
pub mod patient;
pub mod result;
pub mod status;

// Re-export commonly used types for convenience
pub use errors::{LinkageError, PseudonymizerError, RecordErrorDetail, StorageError};
pub use identity::{IdentifyingData, IdentityValidator, IdentityViolation, MedicalData};
pub use ids::{Pseudonym, RecordKey, RequestToken};
pub use patient::{PatientRecord, PatientRecordBuilder, RecordSet, SubmissionOutcome};
pub use result::Result;
pub use status::{PatientStatus, StatusPartition};
