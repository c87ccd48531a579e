//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the pseudonymizer configuration file.

use crate::adapters::linkage::LinkageClient;
use crate::config::load_config;
use crate::config::schema::StorageBackend;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also check that the token service answers
    #[arg(long)]
    pub check_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after applying overrides
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Token Service: {}", config.linkage.token_service_url);
        println!("  Vendor: {}", config.linkage.vendor);
        println!(
            "  API Key: {}",
            if config.linkage.api_key.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("  TLS Verify: {}", config.linkage.tls_verify);
        println!("  Max Retries: {}", config.linkage.retry.max_retries);
        println!(
            "  Max Concurrency: {}",
            config.pseudonymization.max_concurrency
        );
        match config.storage.backend {
            StorageBackend::Http => {
                println!("  Storage: http ({})", config.storage.base_url);
            }
            StorageBackend::Memory => println!("  Storage: memory"),
        }
        println!();

        if self.check_connection {
            let client = match LinkageClient::new(config.linkage.clone()) {
                Ok(c) => c,
                Err(e) => {
                    println!("❌ Failed to create linkage client");
                    println!("   Error: {e}");
                    return Ok(2);
                }
            };

            match client.health_check().await {
                Ok(()) => println!("✅ Token service reachable at {}", client.base_url()),
                Err(e) => {
                    println!("❌ Token service check failed");
                    println!("   Error: {e}");
                    return Ok(5);
                }
            }
            println!();
        }

        Ok(0)
    }
}
