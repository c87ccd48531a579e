//! Patient status enumeration
//!
//! The position of a record in the pseudonymization state machine. The first
//! five states belong to the token protocol; the last four are only reached by
//! the medical-data exchange after a record has been pseudonymized.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a record in the pseudonymization state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatientStatus {
    /// Never submitted, or identity changed after a prior success
    #[default]
    Created,
    /// The service assigned a pseudonym
    Pseudonymized,
    /// The service rejected the identity as malformed
    IdatInvalid,
    /// The token was invalid or expired
    TokenInvalid,
    /// The identity conflicts with an existing record
    IdatConflict,
    /// Medical data was stored under the pseudonym
    Processed,
    /// Storing medical data failed
    NotProcessed,
    /// Medical data was found for the pseudonym
    Found,
    /// No medical data exists for the pseudonym
    NotFound,
}

/// Partition a record falls into when a batch is planned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPartition {
    /// Needs a fresh token and a first submission
    ToCreate,
    /// Left in a failure state by an earlier submission
    ToResolve,
    /// Holds a pseudonym but its medical data is not stored yet
    Pseudonymized,
    /// Medical data exchange already happened
    Synced,
}

impl PatientStatus {
    /// Partition used by the batch orchestrator
    pub fn partition(self) -> StatusPartition {
        match self {
            Self::Created => StatusPartition::ToCreate,
            Self::IdatInvalid | Self::TokenInvalid | Self::IdatConflict => {
                StatusPartition::ToResolve
            }
            Self::Pseudonymized | Self::NotProcessed => StatusPartition::Pseudonymized,
            Self::Processed | Self::Found | Self::NotFound => StatusPartition::Synced,
        }
    }

    /// Whether the record ended its last submission in a failure state
    pub fn is_failure(self) -> bool {
        self.partition() == StatusPartition::ToResolve
    }

    /// Whether the record holds a pseudonym
    pub fn has_pseudonym(self) -> bool {
        matches!(
            self.partition(),
            StatusPartition::Pseudonymized | StatusPartition::Synced
        )
    }

    /// Wire/display name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Pseudonymized => "PSEUDONYMIZED",
            Self::IdatInvalid => "IDAT_INVALID",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::IdatConflict => "IDAT_CONFLICT",
            Self::Processed => "PROCESSED",
            Self::NotProcessed => "NOT_PROCESSED",
            Self::Found => "FOUND",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Every status, in declaration order
    pub const ALL: [PatientStatus; 9] = [
        Self::Created,
        Self::Pseudonymized,
        Self::IdatInvalid,
        Self::TokenInvalid,
        Self::IdatConflict,
        Self::Processed,
        Self::NotProcessed,
        Self::Found,
        Self::NotFound,
    ];
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_created() {
        assert_eq!(PatientStatus::default(), PatientStatus::Created);
    }

    #[test]
    fn test_partitions() {
        assert_eq!(
            PatientStatus::Created.partition(),
            StatusPartition::ToCreate
        );
        assert!(PatientStatus::IdatInvalid.is_failure());
        assert!(PatientStatus::TokenInvalid.is_failure());
        assert!(PatientStatus::IdatConflict.is_failure());
        assert!(!PatientStatus::Pseudonymized.is_failure());
        assert_eq!(
            PatientStatus::NotProcessed.partition(),
            StatusPartition::Pseudonymized
        );
        assert_eq!(PatientStatus::Found.partition(), StatusPartition::Synced);
    }

    #[test]
    fn test_has_pseudonym() {
        let with: Vec<_> = PatientStatus::ALL
            .iter()
            .filter(|s| s.has_pseudonym())
            .collect();
        assert_eq!(with.len(), 5);
        assert!(!PatientStatus::Created.has_pseudonym());
    }

    #[test]
    fn test_serialization_matches_display() {
        for status in PatientStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            let back: PatientStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }
}
