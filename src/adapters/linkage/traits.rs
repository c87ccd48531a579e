//! Record-linkage service trait definition
//!
//! This module defines the `RecordLinkageService` trait that abstracts the
//! token service and the patient resource it hands out capability URLs for.
//! The engines only talk to this trait, so tests can plug in an in-process
//! fake.

use super::models::{CreateTokens, IdentityEntry, IdentitySubmission, ReadGrant, SubmissionReply};
use crate::domain::{Pseudonym, RequestToken, Result};
use async_trait::async_trait;

/// Trait for record-linkage service implementations
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::adapters::linkage::{MainzellisteService, RecordLinkageService};
/// use pseudonymizer::config::LinkageConfig;
///
/// # async fn example() -> pseudonymizer::domain::Result<()> {
/// let service = MainzellisteService::new(LinkageConfig::default())?;
/// let bundle = service.issue_create_tokens(3).await?;
/// println!("Received {} tokens", bundle.tokens.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecordLinkageService: Send + Sync {
    /// Issues `count` single-use tokens for identity submissions
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::LinkageError::TransportUnavailable`] if the
    /// service cannot be reached and
    /// [`crate::domain::LinkageError::IssuanceRejected`] if it refuses.
    async fn issue_create_tokens(&self, count: usize) -> Result<CreateTokens>;

    /// Issues one multi-use read token for the given pseudonyms
    ///
    /// # Errors
    ///
    /// Same as [`RecordLinkageService::issue_create_tokens`].
    async fn issue_read_token(&self, pseudonyms: &[Pseudonym]) -> Result<ReadGrant>;

    /// Redeems a create token with one identity
    ///
    /// Returns the raw reply for every HTTP status; only a transport failure
    /// is an error. Implementations must not retry: the token is single-use.
    async fn submit_identity(
        &self,
        token: &RequestToken,
        submission: &IdentitySubmission,
    ) -> Result<SubmissionReply>;

    /// Redeems a read token
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status or an
    /// unparseable body.
    async fn read_identities(&self, token: &RequestToken) -> Result<Vec<IdentityEntry>>;

    /// Base URL of the token service
    fn base_url(&self) -> &str;
}
