//! Record-linkage client factory
//!
//! Picks the service implementation named in the configuration and wraps it
//! behind a shared trait object.

use super::{MainzellisteService, RecordLinkageService};
use crate::config::LinkageConfig;
use crate::domain::{PseudonymizerError, Result};
use std::sync::Arc;

/// Record-linkage client that wraps a service implementation
pub struct LinkageClient {
    service: Arc<dyn RecordLinkageService>,
}

impl LinkageClient {
    /// Create a new client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor is not supported or the HTTP client
    /// cannot be built.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pseudonymizer::adapters::linkage::LinkageClient;
    /// use pseudonymizer::config::LinkageConfig;
    ///
    /// # fn example() -> pseudonymizer::domain::Result<()> {
    /// let client = LinkageClient::new(LinkageConfig::default())?;
    /// println!("Token service: {}", client.base_url());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: LinkageConfig) -> Result<Self> {
        let vendor = config.vendor.to_lowercase();

        let service: Arc<dyn RecordLinkageService> = match vendor.as_str() {
            "mainzelliste" => Arc::new(MainzellisteService::new(config)?),
            _ => {
                return Err(PseudonymizerError::Configuration(format!(
                    "Unsupported record-linkage vendor: {vendor}. Supported vendors: mainzelliste"
                )))
            }
        };

        Ok(Self { service })
    }

    /// Wraps an existing implementation, e.g. an in-process fake
    pub fn from_service(service: Arc<dyn RecordLinkageService>) -> Self {
        Self { service }
    }

    /// Shared handle to the underlying implementation
    pub fn service(&self) -> Arc<dyn RecordLinkageService> {
        Arc::clone(&self.service)
    }

    /// Checks that the token service is reachable and accepts our credentials
    ///
    /// Requests an empty token batch, which issues nothing.
    ///
    /// # Errors
    ///
    /// Returns the error of the probe request.
    pub async fn health_check(&self) -> Result<()> {
        match self.service.issue_create_tokens(0).await {
            Ok(_) => {
                tracing::info!(
                    base_url = self.service.base_url(),
                    "Record-linkage service health check passed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    base_url = self.service.base_url(),
                    error = %e,
                    "Record-linkage service health check failed"
                );
                Err(e)
            }
        }
    }

    /// Base URL of the token service
    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }
}
