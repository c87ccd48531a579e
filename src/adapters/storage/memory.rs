//! In-process medical-data store
//!
//! Used for dry runs and tests. Contents live as long as the store.

use super::{MedicalDataEntry, MedicalDataStore};
use crate::domain::{MedicalData, Pseudonym, Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Medical-data store backed by a map
#[derive(Debug, Default)]
pub struct InMemoryMedicalDataStore {
    entries: RwLock<HashMap<Pseudonym, MedicalData>>,
    unavailable: AtomicBool,
}

impl InMemoryMedicalDataStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent request fail with a connection error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored payloads
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed("in-memory store marked unavailable".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl MedicalDataStore for InMemoryMedicalDataStore {
    async fn store(&self, entries: &[MedicalDataEntry]) -> Result<()> {
        self.check_available()?;
        let mut map = self.entries.write().await;
        for entry in entries {
            map.insert(entry.pseudonym.clone(), entry.mdat.clone());
        }
        Ok(())
    }

    async fn load(&self, pseudonyms: &[Pseudonym]) -> Result<Vec<Option<MedicalData>>> {
        self.check_available()?;
        let map = self.entries.read().await;
        Ok(pseudonyms
            .iter()
            .map(|p| map.get(p).filter(|m| !m.is_absent()).cloned())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
