//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for the identifiers that flow through
//! the pseudonymization protocol. Each type ensures type safety so that a caller
//! key can never be passed where a pseudonym or a token is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Caller-assigned record identifier
///
/// Opaque to the driver; it only has to be unique within a record set.
///
/// # Examples
///
/// ```
/// use pseudonymizer::domain::ids::RecordKey;
///
/// let key = RecordKey::new("row-17").unwrap();
/// assert_eq!(key.as_str(), "row-17");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey(String);

impl RecordKey {
    /// Creates a new RecordKey from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(RecordKey)` if the key is not blank, `Err` otherwise
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("Record key cannot be empty".to_string());
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pseudonym issued by the record-linkage service
///
/// # Examples
///
/// ```
/// use pseudonymizer::domain::ids::Pseudonym;
/// use std::str::FromStr;
///
/// let pid = Pseudonym::from_str("0003Y0WZ").unwrap();
/// assert_eq!(pid.as_str(), "0003Y0WZ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pseudonym(String);

impl Pseudonym {
    /// Creates a new Pseudonym from a string
    ///
    /// Surrounding whitespace is stripped; a blank pseudonym is rejected.
    pub fn new(pseudonym: impl Into<String>) -> Result<Self, String> {
        let pseudonym = pseudonym.into();
        let trimmed = pseudonym.trim();
        if trimmed.is_empty() {
            return Err("Pseudonym cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the pseudonym as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Capability URL issued by the record-linkage service
///
/// A request token authorizes exactly one identity submission (create tokens)
/// or one batch read (read tokens). The service encodes the token id in the
/// `tokenId` query parameter of the URL.
///
/// # Examples
///
/// ```
/// use pseudonymizer::domain::ids::RequestToken;
///
/// let token = RequestToken::new("https://ml.example.org/patients?tokenId=abc-123").unwrap();
/// assert_eq!(token.token_id().as_deref(), Some("abc-123"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestToken(String);

impl RequestToken {
    /// Creates a new RequestToken from its URL
    ///
    /// # Returns
    ///
    /// Returns `Err` if the value is not an absolute http(s) URL
    pub fn new(url: impl Into<String>) -> Result<Self, String> {
        let url = url.into();
        let parsed =
            Url::parse(url.trim()).map_err(|e| format!("Invalid token URL '{url}': {e}"))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!(
                "Invalid token URL '{url}': scheme must be http or https"
            ));
        }

        Ok(Self(parsed.to_string()))
    }

    /// Returns the token URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the token id from the `tokenId` query parameter
    pub fn token_id(&self) -> Option<String> {
        let url = Url::parse(&self.0).ok()?;
        url.query_pairs()
            .find(|(name, _)| name == "tokenId")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype_impls!(RecordKey);
string_newtype_impls!(Pseudonym);
string_newtype_impls!(RequestToken);
