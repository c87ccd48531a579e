//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the pseudonymizer using clap.

pub mod commands;
pub mod records;

use crate::config::{load_config, LoggingConfig};
use clap::{Parser, Subcommand};

/// Pseudonymizer - Mainzelliste record-linkage client
#[derive(Parser, Debug)]
#[command(name = "pseudonymizer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "pseudonymizer.toml",
        env = "PSEUDONYMIZER_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PSEUDONYMIZER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level and sinks for this invocation
    ///
    /// Commands that talk to the services use the `[logging]` section and
    /// `application.log_level` of the configuration file. `--log-level`
    /// overrides the configured level. Without a readable configuration,
    /// logging goes to the console only; the command reports the
    /// configuration error itself.
    pub fn logging_settings(&self) -> (String, LoggingConfig) {
        let console_only = LoggingConfig {
            local_enabled: false,
            ..LoggingConfig::default()
        };

        let (level, logging) = match self.command {
            Commands::Pseudonymize(_) | Commands::Depseudonymize(_) => {
                match load_config(&self.config) {
                    Ok(config) => (config.application.log_level, config.logging),
                    Err(_) => ("info".to_string(), console_only),
                }
            }
            _ => ("info".to_string(), console_only),
        };

        (self.log_level.clone().unwrap_or(level), logging)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pseudonymize a record set and send its medical data
    Pseudonymize(commands::pseudonymize::PseudonymizeArgs),

    /// Resolve pseudonyms to identities and medical data
    Depseudonymize(commands::depseudonymize::DepseudonymizeArgs),

    /// Show per-status counts of a record set
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
