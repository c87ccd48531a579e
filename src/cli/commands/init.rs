//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pseudonymizer.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing pseudonymizer configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set PSEUDONYMIZER_API_KEY in your environment or .env file");
                println!("  3. Validate configuration: pseudonymizer validate-config --check-connection");
                println!("  4. Pseudonymize: pseudonymizer pseudonymize --input records.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Pseudonymizer Configuration File
# Client for a Mainzelliste record-linkage service

environment = "development"

[application]
log_level = "info"
dry_run = false

[linkage]
token_service_url = "http://localhost:8080"
vendor = "mainzelliste"
api_key = "${PSEUDONYMIZER_API_KEY}"
tls_verify = true
timeout_seconds = 30

[linkage.retry]
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 5000
backoff_multiplier = 2.0

[pseudonymization]
max_concurrency = 4
retry_succeeded = false

[storage]
backend = "http"
base_url = "http://localhost:8080"

[logging]
local_enabled = false
local_path = "/var/log/pseudonymizer"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Pseudonymizer Configuration File
# Client for a Mainzelliste record-linkage service
#
# Values of the form ${VAR} are replaced from the environment. Every setting
# can also be overridden with PSEUDONYMIZER_<SECTION>_<KEY>, for example
# PSEUDONYMIZER_LINKAGE_TOKEN_SERVICE_URL.

# Runtime environment: development | staging | production
# Production refuses tls_verify = false.
environment = "development"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode: pseudonymize, but don't send medical data
dry_run = false

# ============================================================================
# Record-Linkage Service
# ============================================================================
[linkage]
# Base URL of the Mainzelliste instance
token_service_url = "http://localhost:8080"

# Service implementation (currently only "mainzelliste")
vendor = "mainzelliste"

# API key sent with token requests (use an environment variable)
api_key = "${PSEUDONYMIZER_API_KEY}"

# TLS/SSL verification
tls_verify = true

# Request timeout in seconds
timeout_seconds = 30

# Retries for token issuance and identity reads.
# Identity submissions are never retried: a token can be redeemed once.
[linkage.retry]
max_retries = 3            # retries after the first attempt, 0-10
initial_delay_ms = 500
max_delay_ms = 5000
backoff_multiplier = 2.0

# ============================================================================
# Pseudonymization
# ============================================================================
[pseudonymization]
# Identity submissions in flight at once (1-32)
max_concurrency = 4

# Send medical data again for records that are already synced
retry_succeeded = false

# ============================================================================
# Medical-Data Store
# ============================================================================
[storage]
# Backend: http | memory
backend = "http"

# Base URL of the medical-data API (http backend only)
base_url = "http://localhost:8080"

timeout_seconds = 30

[storage.retry]
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 5000
backoff_multiplier = 2.0

# ============================================================================
# Logging
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = false

# Local log directory
local_path = "/var/log/pseudonymizer"

# Log rotation: daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}
