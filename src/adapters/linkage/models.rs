//! Record-linkage API models
//!
//! Wire shapes of the token service and the Mainzelliste patient resource,
//! plus the typed values the rest of the crate works with.

use crate::domain::{
    IdentifyingData, IdentityValidator, IdentityViolation, LinkageError, PatientRecord, Pseudonym,
    RequestToken, Result,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Tokens issued for a batch of identity submissions
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTokens {
    /// Single-use tokens in issuance order
    pub tokens: Vec<RequestToken>,

    /// Whether redemption goes through the callback path
    pub use_callback: bool,
}

/// Read token for a set of pseudonyms
#[derive(Debug, Clone, PartialEq)]
pub struct ReadGrant {
    /// Multi-use read token
    pub token: RequestToken,

    /// Pseudonyms the service reported as unknown
    pub invalid: Vec<Pseudonym>,
}

/// Body of `GET /api/tokens/addPatient/{count}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokensResponse {
    #[serde(default)]
    pub use_callback: bool,
    pub url_tokens: Vec<String>,
}

impl TryFrom<CreateTokensResponse> for CreateTokens {
    type Error = LinkageError;

    fn try_from(response: CreateTokensResponse) -> std::result::Result<Self, Self::Error> {
        let tokens = response
            .url_tokens
            .into_iter()
            .map(RequestToken::new)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(LinkageError::InvalidResponse)?;

        Ok(Self {
            tokens,
            use_callback: response.use_callback,
        })
    }
}

/// Body of `POST /api/tokens/readPatients`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadTokenResponse {
    pub url: String,
    #[serde(default)]
    pub invalid_pseudonyms: Vec<String>,
}

impl TryFrom<ReadTokenResponse> for ReadGrant {
    type Error = LinkageError;

    fn try_from(response: ReadTokenResponse) -> std::result::Result<Self, Self::Error> {
        let token = RequestToken::new(response.url).map_err(LinkageError::InvalidResponse)?;
        let invalid = response
            .invalid_pseudonyms
            .into_iter()
            .map(Pseudonym::new)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(LinkageError::InvalidResponse)?;

        Ok(Self { token, invalid })
    }
}

/// Form body of one identity submission
///
/// Built from a record's validated IDAT, so it can never carry blank names
/// or a future birthdate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySubmission {
    pub firstname: String,
    pub lastname: String,
    pub day: String,
    pub month: String,
    pub year: String,
    pub sureness: bool,
}

impl IdentitySubmission {
    /// Form fields for the given identity
    pub fn new(idat: &IdentifyingData, sureness: bool) -> Self {
        let birthdate = idat.birthdate();
        Self {
            firstname: idat.firstname().to_string(),
            lastname: idat.lastname().to_string(),
            day: format!("{:02}", birthdate.day()),
            month: format!("{:02}", birthdate.month()),
            year: format!("{:04}", birthdate.year()),
            sureness,
        }
    }

    /// Form fields for the record's current identity and sureness hint
    pub fn from_record(record: &PatientRecord) -> Self {
        Self::new(record.idat(), record.sureness())
    }
}

/// Raw reply to an identity submission
///
/// Interpretation into an outcome happens in the pseudonymization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReply {
    /// HTTP status code
    pub status: u16,

    /// Response body, possibly empty
    pub body: String,
}

impl SubmissionReply {
    /// Creates a reply
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parses the id of a `201 Created` body
    ///
    /// The service answers either with an id list (`[{"idString", "tentative"}]`)
    /// or a single object (`{"newId", "tentative"}`). Returns `Ok(None)` for an
    /// empty body, which is what the callback path sends.
    ///
    /// # Errors
    ///
    /// Returns [`LinkageError::InvalidResponse`] if the body is not one of the
    /// two shapes.
    pub fn created_id(&self) -> Result<Option<IdString>> {
        let body = self.body.trim();
        if body.is_empty() {
            return Ok(None);
        }

        let parsed: CreatedBody = serde_json::from_str(body).map_err(|e| {
            LinkageError::InvalidResponse(format!("unparseable 201 body: {e}"))
        })?;

        match parsed {
            CreatedBody::List(mut ids) => {
                if ids.is_empty() {
                    return Err(LinkageError::InvalidResponse("201 body has no ids".into()).into());
                }
                Ok(Some(ids.swap_remove(0)))
            }
            CreatedBody::Single { new_id, tentative } => Ok(Some(IdString {
                id_string: new_id,
                tentative,
            })),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedBody {
    List(Vec<IdString>),
    #[serde(rename_all = "camelCase")]
    Single {
        new_id: String,
        #[serde(default)]
        tentative: bool,
    },
}

/// One id of a patient as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdString {
    pub id_string: String,
    #[serde(default)]
    pub tentative: bool,
}

/// Identity fields as returned by a read token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityFields {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub year: String,
}

/// One patient returned by redeeming a read token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    #[serde(default)]
    pub fields: IdentityFields,
    #[serde(default)]
    pub ids: Vec<IdString>,
}

impl IdentityEntry {
    /// Entry as the service would return it for the given identity
    pub fn new(idat: &IdentifyingData, id: IdString) -> Self {
        let submission = IdentitySubmission::new(idat, false);
        Self {
            fields: IdentityFields {
                firstname: submission.firstname,
                lastname: submission.lastname,
                day: submission.day,
                month: submission.month,
                year: submission.year,
            },
            ids: vec![id],
        }
    }

    /// Rebuilds validated IDAT from the returned fields
    ///
    /// # Errors
    ///
    /// Returns the violation if the service sent fields that do not form a
    /// valid identity.
    pub fn identity(
        &self,
        validator: &IdentityValidator,
    ) -> std::result::Result<IdentifyingData, IdentityViolation> {
        validator.validate_parts(
            &self.fields.firstname,
            &self.fields.lastname,
            &self.fields.day,
            &self.fields.month,
            &self.fields.year,
        )
    }
}
