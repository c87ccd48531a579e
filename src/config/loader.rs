//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{PseudonymizerConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::PseudonymizerError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`PseudonymizerConfig`]
/// 4. Applies environment variable overrides (`PSEUDONYMIZER_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pseudonymizer::config::loader::load_config;
///
/// let config = load_config("pseudonymizer.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PseudonymizerConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PseudonymizerError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PseudonymizerError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from a TOML string
///
/// Same pipeline as [`load_config`] minus the file access.
///
/// # Errors
///
/// See [`load_config`].
pub fn parse_config(contents: &str) -> Result<PseudonymizerConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PseudonymizerConfig = toml::from_str(&contents)
        .map_err(|e| PseudonymizerError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PseudonymizerError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PseudonymizerError::Other(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PseudonymizerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the `PSEUDONYMIZER_*` prefix
///
/// Variables follow the pattern `PSEUDONYMIZER_<SECTION>_<KEY>`, for example
/// `PSEUDONYMIZER_LINKAGE_TOKEN_SERVICE_URL`. Numeric overrides that fail to
/// parse are ignored.
fn apply_env_overrides(config: &mut PseudonymizerConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PSEUDONYMIZER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Linkage overrides
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LINKAGE_TOKEN_SERVICE_URL") {
        config.linkage.token_service_url = val;
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LINKAGE_API_KEY") {
        config.linkage.api_key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LINKAGE_TLS_VERIFY") {
        config.linkage.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LINKAGE_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.linkage.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LINKAGE_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.linkage.retry.max_retries = retries;
        }
    }

    // Pseudonymization overrides
    if let Ok(val) = std::env::var("PSEUDONYMIZER_PSEUDONYMIZATION_MAX_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.pseudonymization.max_concurrency = concurrency;
        }
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_PSEUDONYMIZATION_RETRY_SUCCEEDED") {
        config.pseudonymization.retry_succeeded = val.parse().unwrap_or(false);
    }

    // Storage overrides
    if let Ok(val) = std::env::var("PSEUDONYMIZER_STORAGE_BACKEND") {
        config.storage.backend = match val.to_lowercase().as_str() {
            "http" => StorageBackend::Http,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(PseudonymizerError::Configuration(format!(
                    "Invalid PSEUDONYMIZER_STORAGE_BACKEND '{other}'. Must be one of: http, memory"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_STORAGE_BASE_URL") {
        config.storage.base_url = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("PSEUDONYMIZER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
