//! Patient record and record set
//!
//! A [`PatientRecord`] carries a patient's identity, medical payload and its
//! position in the pseudonymization state machine. Records are only mutated
//! through the transition methods below; the engines never touch fields
//! directly.

use super::identity::{IdentifyingData, MedicalData};
use super::ids::{Pseudonym, RecordKey, RequestToken};
use super::status::PatientStatus;
use super::{PseudonymizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interpreted reply to one identity submission
///
/// These are the four outcomes the protocol defines. Anything else the
/// service answers is an error, not an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// A pseudonym was assigned
    Pseudonymized {
        /// Assigned pseudonym
        pseudonym: Pseudonym,
        /// Ambiguous-match flag reported by the service
        tentative: bool,
    },
    /// The identity was rejected as malformed
    IdentityInvalid,
    /// The token was invalid or expired
    TokenInvalid,
    /// The identity conflicts with an existing record
    IdentityConflict,
}

impl SubmissionOutcome {
    /// Status a record ends up in after this outcome
    pub fn resulting_status(&self) -> PatientStatus {
        match self {
            Self::Pseudonymized { .. } => PatientStatus::Pseudonymized,
            Self::IdentityInvalid => PatientStatus::IdatInvalid,
            Self::TokenInvalid => PatientStatus::TokenInvalid,
            Self::IdentityConflict => PatientStatus::IdatConflict,
        }
    }
}

/// A patient record tracked through the pseudonymization protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    key: RecordKey,
    idat: IdentifyingData,
    #[serde(default)]
    mdat: MedicalData,
    #[serde(default)]
    pseudonym: Option<Pseudonym>,
    #[serde(default)]
    sureness: bool,
    #[serde(default)]
    tentative: bool,
    #[serde(default)]
    status: PatientStatus,
    #[serde(default)]
    active_token: Option<RequestToken>,
    #[serde(default)]
    token_uses_callback: Option<bool>,
    #[serde(default)]
    amended: bool,
}

impl PatientRecord {
    /// Creates a fresh record in [`PatientStatus::Created`]
    pub fn new(key: RecordKey, idat: IdentifyingData, mdat: MedicalData) -> Self {
        Self {
            key,
            idat,
            mdat,
            pseudonym: None,
            sureness: false,
            tentative: false,
            status: PatientStatus::Created,
            active_token: None,
            token_uses_callback: None,
            amended: false,
        }
    }

    /// Creates a new builder
    pub fn builder() -> PatientRecordBuilder {
        PatientRecordBuilder::new()
    }

    /// Caller-assigned key
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Identifying data
    pub fn idat(&self) -> &IdentifyingData {
        &self.idat
    }

    /// Medical payload
    pub fn mdat(&self) -> &MedicalData {
        &self.mdat
    }

    /// Assigned pseudonym, if any
    pub fn pseudonym(&self) -> Option<&Pseudonym> {
        self.pseudonym.as_ref()
    }

    /// Sureness hint sent with the next submission
    pub fn sureness(&self) -> bool {
        self.sureness
    }

    /// Ambiguous-match flag from the last successful submission
    pub fn tentative(&self) -> bool {
        self.tentative
    }

    /// Current status
    pub fn status(&self) -> PatientStatus {
        self.status
    }

    /// Token retained for the next submission, if any
    pub fn active_token(&self) -> Option<&RequestToken> {
        self.active_token.as_ref()
    }

    /// Whether the active token redeems through the callback path
    pub fn token_uses_callback(&self) -> Option<bool> {
        self.token_uses_callback
    }

    /// Whether the caller changed identity or sureness since the last reply
    ///
    /// Records rejected as [`PatientStatus::IdatInvalid`] are only resubmitted
    /// once this is set.
    pub fn is_amended(&self) -> bool {
        self.amended
    }

    /// Replaces the identifying data
    ///
    /// A changed identity invalidates an earlier successful claim: if the
    /// record already holds a pseudonym, it returns to
    /// [`PatientStatus::Created`]. Records in a failure state keep their
    /// status and token and resubmit the new identity on the next resolution
    /// pass.
    pub fn set_idat(&mut self, idat: IdentifyingData) {
        if idat == self.idat {
            return;
        }
        self.idat = idat;

        if self.status.has_pseudonym() {
            self.pseudonym = None;
            self.tentative = false;
            self.active_token = None;
            self.token_uses_callback = None;
            self.status = PatientStatus::Created;
        } else if self.status.is_failure() {
            self.amended = true;
        }
    }

    /// Replaces the medical payload
    pub fn set_mdat(&mut self, mdat: MedicalData) {
        self.mdat = mdat;
    }

    /// Adjusts the sureness hint, e.g. after disambiguating a conflict
    pub fn set_sureness(&mut self, sureness: bool) {
        if sureness != self.sureness && self.status.is_failure() {
            self.amended = true;
        }
        self.sureness = sureness;
    }

    /// Binds a freshly issued token to this record
    pub fn assign_token(&mut self, token: RequestToken, uses_callback: bool) {
        self.active_token = Some(token);
        self.token_uses_callback = Some(uses_callback);
    }

    /// Drops the active token without changing the status
    ///
    /// Used when the service answered outside the defined outcome set and it
    /// is unknown whether the token was consumed.
    pub fn discard_token(&mut self) {
        self.active_token = None;
        self.token_uses_callback = None;
    }

    /// Applies the interpreted reply of one submission
    pub fn apply_outcome(&mut self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Pseudonymized {
                pseudonym,
                tentative,
            } => {
                self.pseudonym = Some(pseudonym.clone());
                self.tentative = *tentative;
                self.discard_token();
            }
            SubmissionOutcome::IdentityInvalid | SubmissionOutcome::IdentityConflict => {
                // token stays for a later resubmission
            }
            SubmissionOutcome::TokenInvalid => self.discard_token(),
        }
        self.amended = false;
        self.status = outcome.resulting_status();
    }

    /// Records the result of sending medical data for this pseudonym
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record holds no pseudonym.
    pub fn mark_synced(&mut self, stored: bool) -> Result<()> {
        self.require_pseudonym()?;
        self.status = if stored {
            PatientStatus::Processed
        } else {
            PatientStatus::NotProcessed
        };
        Ok(())
    }

    /// Records the result of requesting medical data for this pseudonym
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record holds no pseudonym.
    pub fn mark_lookup(&mut self, found: bool) -> Result<()> {
        self.require_pseudonym()?;
        self.status = if found {
            PatientStatus::Found
        } else {
            PatientStatus::NotFound
        };
        Ok(())
    }

    fn require_pseudonym(&self) -> Result<()> {
        if self.pseudonym.is_none() || !self.status.has_pseudonym() {
            return Err(PseudonymizerError::Validation(format!(
                "record {} has no pseudonym (status {})",
                self.key, self.status
            )));
        }
        Ok(())
    }
}

/// Builder for [`PatientRecord`]
#[derive(Debug, Default)]
pub struct PatientRecordBuilder {
    key: Option<RecordKey>,
    idat: Option<IdentifyingData>,
    mdat: MedicalData,
    sureness: bool,
    pseudonym: Option<(Pseudonym, bool)>,
}

impl PatientRecordBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record key
    pub fn key(mut self, key: impl Into<String>) -> Result<Self> {
        self.key = Some(RecordKey::new(key).map_err(PseudonymizerError::Validation)?);
        Ok(self)
    }

    /// Sets the identifying data
    pub fn idat(mut self, idat: IdentifyingData) -> Self {
        self.idat = Some(idat);
        self
    }

    /// Sets the medical payload
    pub fn mdat(mut self, mdat: impl Into<MedicalData>) -> Self {
        self.mdat = mdat.into();
        self
    }

    /// Sets the sureness hint
    pub fn sureness(mut self, sureness: bool) -> Self {
        self.sureness = sureness;
        self
    }

    /// Builds an already pseudonymized record, as returned by a lookup
    pub fn pseudonymized(mut self, pseudonym: Pseudonym, tentative: bool) -> Self {
        self.pseudonym = Some((pseudonym, tentative));
        self
    }

    /// Builds the record
    ///
    /// # Errors
    ///
    /// Returns a validation error if the key or identity is missing.
    pub fn build(self) -> Result<PatientRecord> {
        let key = self
            .key
            .ok_or_else(|| PseudonymizerError::Validation("record key is required".into()))?;
        let idat = self.idat.ok_or_else(|| {
            PseudonymizerError::Validation(format!("identifying data is required for {key}"))
        })?;

        let mut record = PatientRecord::new(key, idat, self.mdat);
        record.sureness = self.sureness;
        if let Some((pseudonym, tentative)) = self.pseudonym {
            record.apply_outcome(&SubmissionOutcome::Pseudonymized {
                pseudonym,
                tentative,
            });
        }
        Ok(record)
    }
}

/// Caller-owned, insertion-ordered collection of records with unique keys
///
/// Orchestration calls borrow the set mutably for their whole duration, so
/// a set can never be worked on by two batches at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PatientRecord>", into = "Vec<PatientRecord>")]
pub struct RecordSet {
    records: Vec<PatientRecord>,
    index: HashMap<RecordKey, usize>,
}

impl RecordSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set, rejecting duplicate keys
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first duplicate key.
    pub fn from_records(records: Vec<PatientRecord>) -> Result<Self> {
        let mut set = Self::new();
        for record in records {
            set.insert(record)?;
        }
        Ok(set)
    }

    /// Appends a record
    ///
    /// # Errors
    ///
    /// Returns a validation error if a record with the same key exists.
    pub fn insert(&mut self, record: PatientRecord) -> Result<()> {
        if self.index.contains_key(record.key()) {
            return Err(PseudonymizerError::Validation(format!(
                "duplicate record key: {}",
                record.key()
            )));
        }
        self.index.insert(record.key().clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Looks up a record by key
    pub fn get(&self, key: &RecordKey) -> Option<&PatientRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Looks up a record by key for mutation
    pub fn get_mut(&mut self, key: &RecordKey) -> Option<&mut PatientRecord> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PatientRecord> {
        self.records.iter()
    }

    /// Keys of all records matching the predicate, in insertion order
    pub fn keys_where(&self, predicate: impl Fn(&PatientRecord) -> bool) -> Vec<RecordKey> {
        self.records
            .iter()
            .filter(|r| predicate(r))
            .map(|r| r.key().clone())
            .collect()
    }

    /// Number of records per status, for every status
    pub fn status_counts(&self) -> Vec<(PatientStatus, usize)> {
        PatientStatus::ALL
            .iter()
            .map(|&status| {
                let count = self.records.iter().filter(|r| r.status() == status).count();
                (status, count)
            })
            .collect()
    }

    /// Consumes the set and returns its records
    pub fn into_records(self) -> Vec<PatientRecord> {
        self.records
    }
}

impl TryFrom<Vec<PatientRecord>> for RecordSet {
    type Error = PseudonymizerError;

    fn try_from(records: Vec<PatientRecord>) -> Result<Self> {
        Self::from_records(records)
    }
}

impl From<RecordSet> for Vec<PatientRecord> {
    fn from(set: RecordSet) -> Self {
        set.records
    }
}
