//! HTTP medical-data store
//!
//! Saves and loads payloads through the `/api/patients/save` and
//! `/api/patients/load` endpoints of the token service backend.

use super::{MedicalDataEntry, MedicalDataStore};
use crate::adapters::retry::retry_request;
use crate::config::StorageConfig;
use crate::domain::{MedicalData, PseudonymizerError, Pseudonym, Result, StorageError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Medical-data store reached over HTTP
pub struct HttpMedicalDataStore {
    base_url: String,
    client: Client,
    config: StorageConfig,
}

impl HttpMedicalDataStore {
    /// Create a new store client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                PseudonymizerError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Base URL of the store
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn connection_error(e: reqwest::Error) -> PseudonymizerError {
    PseudonymizerError::from(StorageError::ConnectionFailed(e.to_string()))
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(PseudonymizerError::from(StorageError::RequestFailed {
        status,
        message,
    }))
}

#[async_trait]
impl MedicalDataStore for HttpMedicalDataStore {
    async fn store(&self, entries: &[MedicalDataEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let url = format!("{}/api/patients/save", self.base_url);
        tracing::debug!(url = %url, count = entries.len(), "Saving medical data");

        retry_request(&self.config.retry, || async {
            let resp = self
                .client
                .post(&url)
                .json(entries)
                .send()
                .await
                .map_err(connection_error)?;
            check_status(resp).await.map(|_| ())
        })
        .await
    }

    async fn load(&self, pseudonyms: &[Pseudonym]) -> Result<Vec<Option<MedicalData>>> {
        if pseudonyms.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/patients/load", self.base_url);
        tracing::debug!(url = %url, count = pseudonyms.len(), "Loading medical data");

        let payloads = retry_request(&self.config.retry, || async {
            let resp = self
                .client
                .post(&url)
                .json(pseudonyms)
                .send()
                .await
                .map_err(connection_error)?;

            check_status(resp)
                .await?
                .json::<Vec<Option<String>>>()
                .await
                .map_err(|e| PseudonymizerError::from(StorageError::InvalidResponse(e.to_string())))
        })
        .await?;

        if payloads.len() != pseudonyms.len() {
            return Err(StorageError::LengthMismatch {
                expected: pseudonyms.len(),
                actual: payloads.len(),
            }
            .into());
        }

        Ok(payloads
            .into_iter()
            .map(|payload| payload.map(MedicalData::from).filter(|m| !m.is_absent()))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
