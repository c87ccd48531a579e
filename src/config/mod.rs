//! Configuration management for the pseudonymizer.
//!
//! # Overview
//!
//! Configuration comes from a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PSEUDONYMIZER_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`LinkageConfig`] - Token service URL, API key, TLS, timeouts, retries
//! - [`PseudonymizationConfig`] - Submission concurrency, re-sync behavior
//! - [`StorageConfig`] - Medical-data store backend
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [linkage]
//! token_service_url = "https://tokens.example.org"
//! api_key = "${ML_API_KEY}"
//!
//! [pseudonymization]
//! max_concurrency = 8
//!
//! [storage]
//! backend = "http"
//! base_url = "https://tokens.example.org"
//! ```
//!
//! ```rust,no_run
//! use pseudonymizer::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pseudonymizer.toml")?;
//! println!("Token service: {}", config.linkage.token_service_url);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, Environment, LinkageConfig, LoggingConfig, PseudonymizationConfig,
    PseudonymizerConfig, RetryConfig, StorageBackend, StorageConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
