//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables hold `ENV_MUTEX` to avoid
//! interference between tests.

use pseudonymizer::config::load_config;
use pseudonymizer::config::schema::{Environment, StorageBackend};
use pseudonymizer::core::batch::BatchOrchestrator;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use test_case::test_case;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "PSEUDONYMIZER_APPLICATION_LOG_LEVEL",
        "PSEUDONYMIZER_APPLICATION_DRY_RUN",
        "PSEUDONYMIZER_LINKAGE_TOKEN_SERVICE_URL",
        "PSEUDONYMIZER_LINKAGE_API_KEY",
        "PSEUDONYMIZER_LINKAGE_MAX_RETRIES",
        "PSEUDONYMIZER_PSEUDONYMIZATION_MAX_CONCURRENCY",
        "PSEUDONYMIZER_STORAGE_BACKEND",
        "TEST_MAINZELLISTE_KEY",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
environment = "staging"

[application]
log_level = "debug"
dry_run = true

[linkage]
token_service_url = "https://ml.example.org/"
vendor = "mainzelliste"
api_key = "abc123"
tls_verify = true
timeout_seconds = 15

[linkage.retry]
max_retries = 5
initial_delay_ms = 100
max_delay_ms = 1000
backoff_multiplier = 3.0

[pseudonymization]
max_concurrency = 8
retry_succeeded = true

[storage]
backend = "http"
base_url = "https://mdat.example.org"
timeout_seconds = 20

[logging]
local_enabled = true
local_path = "/tmp/pseudonymizer-logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).expect("Failed to load config");

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);

    assert_eq!(config.linkage.token_service_url, "https://ml.example.org/");
    assert_eq!(
        config
            .linkage
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().as_ref().to_string()),
        Some("abc123".to_string())
    );
    assert_eq!(config.linkage.timeout_seconds, 15);
    assert_eq!(config.linkage.retry.max_retries, 5);
    assert_eq!(config.linkage.retry.initial_delay_ms, 100);
    assert_eq!(config.linkage.retry.backoff_multiplier, 3.0);

    assert_eq!(config.pseudonymization.max_concurrency, 8);
    assert!(config.pseudonymization.retry_succeeded);

    assert_eq!(config.storage.backend, StorageBackend::Http);
    assert_eq!(config.storage.base_url, "https://mdat.example.org");
    assert_eq!(config.storage.timeout_seconds, 20);

    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[linkage]
token_service_url = "http://localhost:8080"
"#,
    );

    let config = load_config(file.path()).expect("Failed to load config");

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.application.log_level, "info");
    assert!(!config.application.dry_run);
    assert_eq!(config.linkage.vendor, "mainzelliste");
    assert!(config.linkage.api_key.is_none());
    assert!(config.linkage.tls_verify);
    assert_eq!(config.linkage.retry.max_retries, 3);
    assert_eq!(config.pseudonymization.max_concurrency, 4);
    assert!(!config.pseudonymization.retry_succeeded);
    assert_eq!(config.storage.backend, StorageBackend::Http);
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_MAINZELLISTE_KEY", "secret_key");

    let file = write_config(
        r#"
[linkage]
token_service_url = "http://localhost:8080"
api_key = "${TEST_MAINZELLISTE_KEY}"
"#,
    );

    let config = load_config(file.path()).expect("Failed to load config");

    let key = config.linkage.api_key.expect("api key should be set");
    assert_eq!(key.expose_secret().as_ref(), "secret_key");

    cleanup_env_vars();
}

#[test]
fn test_missing_substitution_variable_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[linkage]
token_service_url = "http://localhost:8080"
api_key = "${TEST_MAINZELLISTE_KEY}"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_MAINZELLISTE_KEY"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("PSEUDONYMIZER_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var(
        "PSEUDONYMIZER_LINKAGE_TOKEN_SERVICE_URL",
        "https://override.example.org",
    );
    std::env::set_var("PSEUDONYMIZER_PSEUDONYMIZATION_MAX_CONCURRENCY", "16");
    std::env::set_var("PSEUDONYMIZER_STORAGE_BACKEND", "memory");

    let file = write_config(
        r#"
[application]
log_level = "info"

[linkage]
token_service_url = "http://localhost:8080"

[pseudonymization]
max_concurrency = 2
"#,
    );

    let config = load_config(file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(
        config.linkage.token_service_url,
        "https://override.example.org"
    );
    assert_eq!(config.pseudonymization.max_concurrency, 16);
    assert_eq!(config.storage.backend, StorageBackend::Memory);

    cleanup_env_vars();
}

#[test]
fn test_override_is_validated() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("PSEUDONYMIZER_PSEUDONYMIZATION_MAX_CONCURRENCY", "64");

    let file = write_config(
        r#"
[linkage]
token_service_url = "http://localhost:8080"
"#,
    );

    let result = load_config(file.path());
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test_case("[application]\nlog_level = \"loud\"" ; "invalid log level")]
#[test_case("environment = \"production\"\n[linkage]\ntls_verify = false" ; "tls off in production")]
#[test_case("[linkage]\nvendor = \"other\"" ; "unknown vendor")]
#[test_case("[linkage]\ntoken_service_url = \"ftp://ml.example.org\"" ; "non http url")]
#[test_case("[linkage]\napi_key = \"  \"" ; "blank api key")]
#[test_case("[linkage.retry]\nmax_retries = 11" ; "too many retries")]
#[test_case("[pseudonymization]\nmax_concurrency = 0" ; "zero concurrency")]
#[test_case("[storage]\nbase_url = \"not a url\"" ; "invalid storage url")]
#[test_case("[logging]\nlocal_rotation = \"weekly\"" ; "unknown rotation")]
fn test_invalid_config_validation(fragment: &str) {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    // fragments override the linkage section where they name it
    let base = if fragment.contains("[linkage]") {
        String::new()
    } else {
        "[linkage]\ntoken_service_url = \"http://localhost:8080\"\n".to_string()
    };
    let content = if fragment.contains("[linkage]") && !fragment.contains("token_service_url") {
        fragment.replacen(
            "[linkage]",
            "[linkage]\ntoken_service_url = \"http://localhost:8080\"",
            1,
        )
    } else {
        fragment.to_string()
    };

    let file = write_config(&format!("{content}\n{base}"));

    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_orchestrator_from_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[linkage]
token_service_url = "http://localhost:8080"

[storage]
backend = "memory"
"#,
    );

    let config = load_config(file.path()).unwrap();
    let (_tx, rx) = tokio::sync::watch::channel(false);

    assert!(BatchOrchestrator::from_config(&config, rx).is_ok());
}
