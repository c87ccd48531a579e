//! Medical-data store factory

use super::{HttpMedicalDataStore, InMemoryMedicalDataStore, MedicalDataStore};
use crate::config::{StorageBackend, StorageConfig};
use crate::domain::Result;
use std::sync::Arc;

/// Create a medical-data store based on the configuration
///
/// # Errors
///
/// Returns an error if the store client cannot be created
pub fn create_medical_data_store(config: &StorageConfig) -> Result<Arc<dyn MedicalDataStore>> {
    match config.backend {
        StorageBackend::Http => {
            tracing::info!(base_url = %config.base_url, "Creating HTTP medical-data store");
            let store = HttpMedicalDataStore::new(config.clone())?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::info!("Creating in-memory medical-data store");
            Ok(Arc::new(InMemoryMedicalDataStore::new()))
        }
    }
}
