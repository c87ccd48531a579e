//! Domain error types
//!
//! This module defines the error hierarchy for the pseudonymizer.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main pseudonymizer error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum PseudonymizerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record-linkage service errors
    #[error("Record-linkage error: {0}")]
    Linkage(#[from] LinkageError),

    /// Medical-data store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation errors (identifying data, record sets)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The batch was interrupted by a shutdown signal
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PseudonymizerError {
    /// Whether this error means the linkage service could not be reached at all.
    ///
    /// Transport failures terminate the enclosing batch; every other per-record
    /// failure is captured into the record's status instead.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PseudonymizerError::Linkage(LinkageError::TransportUnavailable(_))
        )
    }
}

/// Record-linkage service errors
///
/// Errors that occur when talking to the token service or redeeming tokens.
/// These errors don't expose the HTTP client types.
#[derive(Debug, Error)]
pub enum LinkageError {
    /// The service could not be reached
    #[error("Record-linkage service unavailable: {0}")]
    TransportUnavailable(String),

    /// The service rejected the submitted identity as malformed (400)
    #[error("Identity rejected as invalid: {0}")]
    InvalidIdentity(String),

    /// The token was invalid or expired (401)
    #[error("Token invalid or expired: {0}")]
    TokenInvalid(String),

    /// The identity conflicts with an existing record (409)
    #[error("Identity conflicts with an existing record: {0}")]
    IdentityConflict(String),

    /// Any reply outside the defined outcome set
    #[error("Unknown service response: {status} - {message}")]
    UnknownServiceResponse { status: u16, message: String },

    /// A reply that could not be parsed
    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),

    /// The service issued a different number of tokens than requested
    #[error("Token count mismatch: requested {expected}, received {actual}")]
    TokenCountMismatch { expected: usize, actual: usize },

    /// The token service rejected the issuance request
    #[error("Token issuance rejected: {status} - {message}")]
    IssuanceRejected { status: u16, message: String },
}

/// Medical-data store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to connect to the store
    #[error("Failed to connect to medical-data store: {0}")]
    ConnectionFailed(String),

    /// The store answered with a non-success status
    #[error("Medical-data request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    /// A reply that could not be parsed
    #[error("Invalid response from medical-data store: {0}")]
    InvalidResponse(String),

    /// The store returned a different number of entries than requested
    #[error("Medical-data store returned {actual} entries for {expected} pseudonyms")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Per-record failure detail collected during a batch
///
/// Provides additional context for records that ended a batch without a
/// defined outcome.
#[derive(Debug, Clone)]
pub struct RecordErrorDetail {
    /// Key of the affected record
    pub record_key: Option<String>,

    /// HTTP status reported by the service, if any
    pub status: Option<u16>,

    /// Error message
    pub message: String,

    /// Whether the caller may retry the record in a later batch
    pub retryable: bool,
}

impl RecordErrorDetail {
    /// Creates a new record error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            record_key: None,
            status: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets the record key
    pub fn with_record_key(mut self, key: impl Into<String>) -> Self {
        self.record_key = Some(key.into());
        self
    }

    /// Sets the service status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Marks the error as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PseudonymizerError {
    fn from(err: std::io::Error) -> Self {
        PseudonymizerError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PseudonymizerError {
    fn from(err: serde_json::Error) -> Self {
        PseudonymizerError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PseudonymizerError {
    fn from(err: toml::de::Error) -> Self {
        PseudonymizerError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PseudonymizerError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_linkage_error_conversion() {
        let linkage_err = LinkageError::TokenInvalid("tok-1".to_string());
        let err: PseudonymizerError = linkage_err.into();
        assert!(matches!(err, PseudonymizerError::Linkage(_)));
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_err = StorageError::LengthMismatch {
            expected: 3,
            actual: 2,
        };
        let err: PseudonymizerError = storage_err.into();
        assert!(matches!(err, PseudonymizerError::Storage(_)));
        assert!(err.to_string().contains("2 entries for 3"));
    }

    #[test]
    fn test_is_transport() {
        let transport: PseudonymizerError =
            LinkageError::TransportUnavailable("connection refused".to_string()).into();
        assert!(transport.is_transport());

        let unknown: PseudonymizerError = LinkageError::UnknownServiceResponse {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(!unknown.is_transport());
    }

    #[test]
    fn test_record_error_detail_builder() {
        let detail = RecordErrorDetail::new("Unknown response")
            .with_record_key("patient-7")
            .with_status(503)
            .retryable();

        assert_eq!(detail.record_key, Some("patient-7".to_string()));
        assert_eq!(detail.status, Some(503));
        assert!(detail.retryable);
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: PseudonymizerError = json_err.into();
        assert!(matches!(err, PseudonymizerError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: PseudonymizerError = toml_err.into();
        assert!(matches!(err, PseudonymizerError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
