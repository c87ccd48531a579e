//! Mainzelliste record-linkage implementation
//!
//! Talks to a token service that opens Mainzelliste sessions on the client's
//! behalf, then redeems the returned capability URLs directly against the
//! Mainzelliste patient resource.

use super::models::{
    CreateTokens, CreateTokensResponse, IdentityEntry, IdentitySubmission, ReadGrant,
    ReadTokenResponse, SubmissionReply,
};
use super::RecordLinkageService;
use crate::adapters::retry::retry_request;
use crate::config::LinkageConfig;
use crate::domain::{LinkageError, PseudonymizerError, Pseudonym, RequestToken, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Header carrying the Mainzelliste API key
pub const API_KEY_HEADER: &str = "mainzellisteApiKey";

/// Mainzelliste service implementation
///
/// # Example
///
/// ```no_run
/// use pseudonymizer::adapters::linkage::{MainzellisteService, RecordLinkageService};
/// use pseudonymizer::config::LinkageConfig;
///
/// # async fn example() -> pseudonymizer::domain::Result<()> {
/// let service = MainzellisteService::new(LinkageConfig::default())?;
/// let bundle = service.issue_create_tokens(2).await?;
/// assert_eq!(bundle.tokens.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MainzellisteService {
    /// Base URL of the token service, without trailing slash
    base_url: String,

    /// HTTP client for making requests
    client: Client,

    /// Linkage configuration
    config: LinkageConfig,
}

impl MainzellisteService {
    /// Create a new service instance
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: LinkageConfig) -> Result<Self> {
        let base_url = config.token_service_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)));

        if !config.tls_verify {
            tracing::warn!(
                base_url = %base_url,
                "TLS certificate verification disabled for record-linkage service"
            );
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            PseudonymizerError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Adds the API key header when one is configured
    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret().as_ref()),
            None => request,
        }
    }
}

fn transport_error(e: reqwest::Error) -> PseudonymizerError {
    LinkageError::TransportUnavailable(e.to_string()).into()
}

/// Turns a non-success issuance reply into an error
async fn check_issuance(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(LinkageError::IssuanceRejected { status, message }.into())
}

#[async_trait]
impl RecordLinkageService for MainzellisteService {
    async fn issue_create_tokens(&self, count: usize) -> Result<CreateTokens> {
        let url = format!("{}/api/tokens/addPatient/{count}", self.base_url);

        tracing::debug!(url = %url, count = count, "Requesting create tokens");

        let response = retry_request(&self.config.retry, || async {
            let resp = self
                .with_api_key(self.client.get(&url))
                .send()
                .await
                .map_err(transport_error)?;

            check_issuance(resp)
                .await?
                .json::<CreateTokensResponse>()
                .await
                .map_err(|e| PseudonymizerError::from(LinkageError::InvalidResponse(e.to_string())))
        })
        .await?;

        Ok(CreateTokens::try_from(response)?)
    }

    async fn issue_read_token(&self, pseudonyms: &[Pseudonym]) -> Result<ReadGrant> {
        let url = format!("{}/api/tokens/readPatients", self.base_url);

        tracing::debug!(url = %url, count = pseudonyms.len(), "Requesting read token");

        let response = retry_request(&self.config.retry, || async {
            let resp = self
                .with_api_key(self.client.post(&url))
                .json(pseudonyms)
                .send()
                .await
                .map_err(transport_error)?;

            check_issuance(resp)
                .await?
                .json::<ReadTokenResponse>()
                .await
                .map_err(|e| PseudonymizerError::from(LinkageError::InvalidResponse(e.to_string())))
        })
        .await?;

        Ok(ReadGrant::try_from(response)?)
    }

    async fn submit_identity(
        &self,
        token: &RequestToken,
        submission: &IdentitySubmission,
    ) -> Result<SubmissionReply> {
        // single-use token: exactly one attempt
        let resp = self
            .client
            .post(token.as_str())
            .form(submission)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport_error)?;

        Ok(SubmissionReply::new(status, body))
    }

    async fn read_identities(&self, token: &RequestToken) -> Result<Vec<IdentityEntry>> {
        retry_request(&self.config.retry, || async {
            let resp = self
                .client
                .get(token.as_str())
                .send()
                .await
                .map_err(transport_error)?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let message = resp.text().await.unwrap_or_default();
                return Err(PseudonymizerError::from(
                    LinkageError::UnknownServiceResponse { status, message },
                ));
            }

            resp.json::<Vec<IdentityEntry>>()
                .await
                .map_err(|e| PseudonymizerError::from(LinkageError::InvalidResponse(e.to_string())))
        })
        .await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
