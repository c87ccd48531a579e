//! Logging and observability
//!
//! Structured logging with:
//! - JSON-formatted log files
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! Identifying data is never logged in plaintext. Records are referred to by
//! key and, where an identity has to be told apart, by its fingerprint.
//!
//! # Example
//!
//! ```no_run
//! use pseudonymizer::logging::init_logging;
//! use pseudonymizer::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a record status transition
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::log_transition;
/// use pseudonymizer::domain::{PatientStatus, RecordKey};
///
/// let key = RecordKey::new("row-1").unwrap();
/// log_transition!(&key, PatientStatus::Created, PatientStatus::Pseudonymized);
/// ```
#[macro_export]
macro_rules! log_transition {
    ($key:expr, $from:expr, $to:expr) => {
        tracing::debug!(
            record_key = %$key,
            from = %$from,
            to = %$to,
            "Record status changed"
        );
    };
}

/// Log the completion of a batch
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::log_batch_complete;
/// use std::time::Duration;
///
/// log_batch_complete!("pseudonymize", 112, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_batch_complete {
    ($operation:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            duration_ms = $duration.as_millis() as u64,
            "Batch completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::log_error_with_context;
/// use pseudonymizer::domain::PseudonymizerError;
///
/// let error = PseudonymizerError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log progress through a batch
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::log_batch_processing;
///
/// log_batch_processing!(40, 112);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processing batch"
        );
    };
}
