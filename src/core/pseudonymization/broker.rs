//! Token broker
//!
//! Obtains the capability tokens every other protocol step needs. Each call
//! is one round trip, and a batch either gets its full token set or an error.

use crate::adapters::linkage::{CreateTokens, ReadGrant, RecordLinkageService};
use crate::domain::{LinkageError, Pseudonym, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Issues create and read tokens through the linkage service
#[derive(Clone)]
pub struct TokenBroker {
    service: Arc<dyn RecordLinkageService>,
}

impl TokenBroker {
    /// Creates a broker on top of a linkage service
    pub fn new(service: Arc<dyn RecordLinkageService>) -> Self {
        Self { service }
    }

    /// Acquires exactly `count` single-use tokens for identity submissions
    ///
    /// A request for zero tokens returns an empty set without contacting the
    /// service.
    ///
    /// # Errors
    ///
    /// Fails when the service is unreachable or refuses, when it issues a
    /// different number of tokens than requested, or when it hands out the
    /// same token twice.
    pub async fn acquire_create_tokens(&self, count: usize) -> Result<CreateTokens> {
        if count == 0 {
            return Ok(CreateTokens {
                tokens: Vec::new(),
                use_callback: false,
            });
        }

        let issued = self.service.issue_create_tokens(count).await?;

        if issued.tokens.len() != count {
            tracing::error!(
                requested = count,
                received = issued.tokens.len(),
                "Token service issued the wrong number of tokens"
            );
            return Err(LinkageError::TokenCountMismatch {
                expected: count,
                actual: issued.tokens.len(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(count);
        if let Some(duplicate) = issued.tokens.iter().find(|t| !seen.insert(*t)) {
            return Err(LinkageError::InvalidResponse(format!(
                "token issued twice in one batch: {}",
                duplicate.token_id().unwrap_or_default()
            ))
            .into());
        }

        tracing::debug!(
            count = count,
            use_callback = issued.use_callback,
            "Acquired create tokens"
        );

        Ok(issued)
    }

    /// Acquires one read token covering all given pseudonyms
    ///
    /// # Errors
    ///
    /// Fails when the service is unreachable or refuses.
    pub async fn acquire_read_token(&self, pseudonyms: &[Pseudonym]) -> Result<ReadGrant> {
        let grant = self.service.issue_read_token(pseudonyms).await?;

        tracing::debug!(
            requested = pseudonyms.len(),
            invalid = grant.invalid.len(),
            "Acquired read token"
        );

        Ok(grant)
    }
}
