//! Medical-data store abstraction
//!
//! This module defines the trait that medical-data stores must implement.
//! The store only ever sees pseudonyms; identifying data never reaches it.

use crate::domain::{MedicalData, Pseudonym, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One medical payload filed under a pseudonym
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalDataEntry {
    /// Pseudonym the payload belongs to
    pub pseudonym: Pseudonym,

    /// Opaque payload
    pub mdat: MedicalData,
}

impl MedicalDataEntry {
    /// Creates an entry
    pub fn new(pseudonym: Pseudonym, mdat: MedicalData) -> Self {
        Self { pseudonym, mdat }
    }
}

/// Medical-data store trait
#[async_trait]
pub trait MedicalDataStore: Send + Sync {
    /// Stores a batch of entries, replacing earlier payloads for the same pseudonym
    ///
    /// A batch is stored as a whole or not at all.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the batch was not stored.
    async fn store(&self, entries: &[MedicalDataEntry]) -> Result<()>;

    /// Loads the payloads for the given pseudonyms
    ///
    /// The result is aligned with `pseudonyms`; `None` means nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the request fails or the reply does not
    /// line up with the request.
    async fn load(&self, pseudonyms: &[Pseudonym]) -> Result<Vec<Option<MedicalData>>>;

    /// Short name of the backend, for logs
    fn backend_name(&self) -> &'static str;
}
