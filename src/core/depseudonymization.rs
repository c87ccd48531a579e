//! Depseudonymization engine
//!
//! Resolves pseudonyms back to identifying data with a single read token.

use crate::adapters::linkage::RecordLinkageService;
use crate::core::pseudonymization::TokenBroker;
use crate::domain::{IdentifyingData, IdentityValidator, Pseudonym, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Identity a pseudonym resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Validated identifying data
    pub idat: IdentifyingData,
    /// Ambiguous-match flag reported by the service
    pub tentative: bool,
}

/// Result of one depseudonymization request
#[derive(Debug, Clone, Default)]
pub struct DepseudonymizationResult {
    /// Resolved identities by pseudonym
    pub matches: HashMap<Pseudonym, ResolvedIdentity>,
    /// Pseudonyms the service does not know, in request order
    pub invalid: Vec<Pseudonym>,
    /// Pseudonyms that were neither invalid nor resolved, in request order
    pub unresolved: Vec<Pseudonym>,
}

/// Removes repeated pseudonyms, keeping the first occurrence
pub fn dedup_pseudonyms(pseudonyms: &[Pseudonym]) -> Vec<Pseudonym> {
    let mut seen = HashSet::with_capacity(pseudonyms.len());
    pseudonyms
        .iter()
        .filter(|p| seen.insert(*p))
        .cloned()
        .collect()
}

/// Resolves pseudonyms to identifying data
#[derive(Clone)]
pub struct DepseudonymizationEngine {
    broker: TokenBroker,
    service: Arc<dyn RecordLinkageService>,
}

impl DepseudonymizationEngine {
    /// Creates an engine
    pub fn new(broker: TokenBroker, service: Arc<dyn RecordLinkageService>) -> Self {
        Self { broker, service }
    }

    /// Resolves the given pseudonyms
    ///
    /// Duplicates are resolved once. Identities returned by the service go
    /// through the same validation as caller input; an entry that fails it
    /// leaves its pseudonym unresolved.
    ///
    /// # Errors
    ///
    /// Fails if the read token cannot be acquired or redeemed.
    pub async fn depseudonymize(&self, pseudonyms: &[Pseudonym]) -> Result<DepseudonymizationResult> {
        let requested = dedup_pseudonyms(pseudonyms);
        let mut result = DepseudonymizationResult::default();

        if requested.is_empty() {
            return Ok(result);
        }

        let grant = self.broker.acquire_read_token(&requested).await?;
        let reported_invalid: HashSet<&Pseudonym> = grant.invalid.iter().collect();

        let (invalid, valid): (Vec<Pseudonym>, Vec<Pseudonym>) = requested
            .into_iter()
            .partition(|p| reported_invalid.contains(p));
        result.invalid = invalid;

        if valid.is_empty() {
            tracing::info!(
                invalid = result.invalid.len(),
                "No valid pseudonyms left, skipping identity read"
            );
            return Ok(result);
        }

        let entries = self.service.read_identities(&grant.token).await?;
        let wanted: HashSet<&Pseudonym> = valid.iter().collect();
        let validator = IdentityValidator::today();

        for entry in &entries {
            for id in &entry.ids {
                let Ok(pseudonym) = Pseudonym::new(id.id_string.as_str()) else {
                    continue;
                };
                if !wanted.contains(&pseudonym) || result.matches.contains_key(&pseudonym) {
                    continue;
                }

                match entry.identity(&validator) {
                    Ok(idat) => {
                        result.matches.insert(
                            pseudonym,
                            ResolvedIdentity {
                                idat,
                                tentative: id.tentative,
                            },
                        );
                    }
                    Err(violation) => {
                        tracing::warn!(
                            pseudonym = %pseudonym,
                            reason = %violation,
                            "Service returned identity that fails validation"
                        );
                    }
                }
            }
        }

        result.unresolved = valid
            .into_iter()
            .filter(|p| !result.matches.contains_key(p))
            .collect();

        tracing::info!(
            matched = result.matches.len(),
            invalid = result.invalid.len(),
            unresolved = result.unresolved.len(),
            "Depseudonymization finished"
        );

        Ok(result)
    }
}
