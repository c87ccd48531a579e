//! Identifying data (IDAT), medical data (MDAT) and the identity validator
//!
//! IDAT can only be obtained through [`IdentityValidator`], so a value of type
//! [`IdentifyingData`] is always trimmed, non-empty and carries a birthdate that
//! is not in the future.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Reasons an identity is rejected before it ever reaches the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityViolation {
    /// First name is blank after trimming
    EmptyFirstname,
    /// Last name is blank after trimming
    EmptyLastname,
    /// Birthdate lies after the reference date
    BirthdateInFuture(NaiveDate),
    /// Day/month/year do not form a calendar date
    InvalidBirthdate(String),
}

impl fmt::Display for IdentityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFirstname => write!(f, "firstname cannot be empty"),
            Self::EmptyLastname => write!(f, "lastname cannot be empty"),
            Self::BirthdateInFuture(date) => {
                write!(f, "birthdate {date} lies in the future")
            }
            Self::InvalidBirthdate(raw) => write!(f, "invalid birthdate: {raw}"),
        }
    }
}

impl std::error::Error for IdentityViolation {}

/// Validated identifying data of a patient
///
/// # Examples
///
/// ```
/// use pseudonymizer::domain::identity::IdentifyingData;
/// use chrono::NaiveDate;
///
/// let idat = IdentifyingData::new(
///     "  Erika ",
///     "Mustermann",
///     NaiveDate::from_ymd_opt(1964, 8, 12).unwrap(),
/// ).unwrap();
/// assert_eq!(idat.firstname(), "Erika");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdentifyingData")]
pub struct IdentifyingData {
    firstname: String,
    lastname: String,
    birthdate: NaiveDate,
}

impl IdentifyingData {
    /// Validates against today's date
    pub fn new(
        firstname: &str,
        lastname: &str,
        birthdate: NaiveDate,
    ) -> Result<Self, IdentityViolation> {
        IdentityValidator::today().validate(firstname, lastname, birthdate)
    }

    /// First name, normalized
    pub fn firstname(&self) -> &str {
        &self.firstname
    }

    /// Last name, normalized
    pub fn lastname(&self) -> &str {
        &self.lastname
    }

    /// Date of birth
    pub fn birthdate(&self) -> NaiveDate {
        self.birthdate
    }

    /// SHA-256 fingerprint of the identity, safe to write to logs
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.firstname.to_lowercase().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.lastname.to_lowercase().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.birthdate.format("%Y-%m-%d").to_string().as_bytes());
        let digest = hasher.finalize();
        format!("{digest:x}")[..16].to_string()
    }
}

#[derive(Deserialize)]
struct RawIdentifyingData {
    firstname: String,
    lastname: String,
    birthdate: NaiveDate,
}

impl TryFrom<RawIdentifyingData> for IdentifyingData {
    type Error = IdentityViolation;

    fn try_from(raw: RawIdentifyingData) -> Result<Self, Self::Error> {
        IdentifyingData::new(&raw.firstname, &raw.lastname, raw.birthdate)
    }
}

/// Normalizes and validates identifying fields
///
/// The reference date is fixed at construction so that a whole batch is
/// validated against the same "today".
#[derive(Debug, Clone, Copy)]
pub struct IdentityValidator {
    reference_date: NaiveDate,
}

impl IdentityValidator {
    /// Validator using the local calendar date
    pub fn today() -> Self {
        Self::with_reference_date(Local::now().date_naive())
    }

    /// Validator using an explicit reference date
    pub fn with_reference_date(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    /// Normalizes the name fields and checks every invariant
    ///
    /// # Errors
    ///
    /// Returns the first [`IdentityViolation`] found.
    pub fn validate(
        &self,
        firstname: &str,
        lastname: &str,
        birthdate: NaiveDate,
    ) -> Result<IdentifyingData, IdentityViolation> {
        let firstname = normalize_name(firstname);
        if firstname.is_empty() {
            return Err(IdentityViolation::EmptyFirstname);
        }

        let lastname = normalize_name(lastname);
        if lastname.is_empty() {
            return Err(IdentityViolation::EmptyLastname);
        }

        if birthdate > self.reference_date {
            return Err(IdentityViolation::BirthdateInFuture(birthdate));
        }

        Ok(IdentifyingData {
            firstname,
            lastname,
            birthdate,
        })
    }

    /// Builds IDAT from the split day/month/year representation used on the wire
    ///
    /// # Errors
    ///
    /// Returns [`IdentityViolation::InvalidBirthdate`] if the parts are not
    /// numeric or do not form a calendar date.
    pub fn validate_parts(
        &self,
        firstname: &str,
        lastname: &str,
        day: &str,
        month: &str,
        year: &str,
    ) -> Result<IdentifyingData, IdentityViolation> {
        let invalid = || IdentityViolation::InvalidBirthdate(format!("{day}.{month}.{year}"));

        let day: u32 = day.trim().parse().map_err(|_| invalid())?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        let birthdate = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

        self.validate(firstname, lastname, birthdate)
    }
}

/// Trims and collapses runs of inner whitespace to a single space
fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Opaque medical payload stored under a pseudonym
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicalData(String);

impl MedicalData {
    /// Wraps a payload without inspecting it
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Returns the payload
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the store answered with its "nothing stored" marker
    pub fn is_absent(&self) -> bool {
        let trimmed = self.0.trim();
        trimmed.is_empty() || trimmed == "{}"
    }
}

impl From<String> for MedicalData {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MedicalData {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
