//! Configuration schema types
//!
//! This module defines the configuration structure that maps to
//! `pseudonymizer.toml`.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Medical-data store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Backend reached over HTTP
    #[default]
    Http,
    /// Process-local map, for dry runs and tests
    Memory,
}

/// Main pseudonymizer configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PseudonymizerConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Record-linkage (token service) configuration
    pub linkage: LinkageConfig,

    /// Pseudonymization protocol settings
    #[serde(default)]
    pub pseudonymization: PseudonymizationConfig,

    /// Medical-data store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PseudonymizerConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.linkage.validate(&self.environment)?;
        self.pseudonymization.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (pseudonymize, but don't send medical data)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Retry configuration
///
/// Applies to token issuance, identity reads and medical-data requests.
/// Identity submissions redeem single-use tokens and are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self, section: &str) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "{section}.retry.max_retries must be between 0 and 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "{section}.retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Record-linkage service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkageConfig {
    /// Base URL of the token service
    pub token_service_url: String,

    /// Service implementation (e.g., "mainzelliste")
    #[serde(default = "default_vendor")]
    pub vendor: String,

    /// API key sent as `mainzellisteApiKey` header (optional)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: Disabling TLS verification exposes identifying
    /// data to man-in-the-middle attacks. Rejected in production.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl LinkageConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        validate_http_url("linkage.token_service_url", &self.token_service_url)?;

        let valid_vendors = ["mainzelliste"];
        if !valid_vendors.contains(&self.vendor.as_str()) {
            return Err(format!(
                "Invalid linkage.vendor '{}'. Must be one of: {}",
                self.vendor,
                valid_vendors.join(", ")
            ));
        }

        if self.timeout_seconds == 0 {
            return Err("linkage.timeout_seconds must be > 0".to_string());
        }

        if let Some(key) = &self.api_key {
            if key.expose_secret().is_blank() {
                return Err("linkage.api_key cannot be empty when set".to_string());
            }
        }

        // Identifying data must never cross an unverified connection in production
        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments. \
                Set 'tls_verify = true', or use environment = \"development\" for local testing."
                    .to_string(),
            );
        }

        self.retry.validate("linkage")?;
        Ok(())
    }
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            token_service_url: "http://localhost:8080".to_string(),
            vendor: default_vendor(),
            api_key: None,
            tls_verify: true,
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

/// Pseudonymization protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PseudonymizationConfig {
    /// Maximum number of identity submissions in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Re-send medical data for records that were already synced
    #[serde(default)]
    pub retry_succeeded: bool,
}

impl PseudonymizationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 || self.max_concurrency > 32 {
            return Err(format!(
                "pseudonymization.max_concurrency must be between 1 and 32, got {}",
                self.max_concurrency
            ));
        }
        Ok(())
    }
}

impl Default for PseudonymizationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            retry_succeeded: false,
        }
    }
}

/// Medical-data store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Base URL of the HTTP store
    #[serde(default = "default_storage_url")]
    pub base_url: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == StorageBackend::Http {
            validate_http_url("storage.base_url", &self.base_url)?;
        }
        if self.timeout_seconds == 0 {
            return Err("storage.timeout_seconds must be > 0".to_string());
        }
        self.retry.validate("storage")?;
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            base_url: default_storage_url(),
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(format!("{field} must start with http:// or https://"));
    }
    url::Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    Ok(())
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_vendor() -> String {
    "mainzelliste".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_concurrency() -> usize {
    4
}

fn default_storage_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_local_path() -> String {
    "/var/log/pseudonymizer".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
