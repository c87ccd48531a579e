//! Pseudonymization engine
//!
//! Redeems create tokens with a record's identity and turns the service's
//! reply into a status transition. Submissions of a batch run concurrently,
//! but every transition is applied on the calling task as replies arrive.

use crate::adapters::linkage::{IdentitySubmission, RecordLinkageService, SubmissionReply};
use crate::domain::{
    LinkageError, PatientRecord, Pseudonym, PseudonymizerError, RecordErrorDetail, RecordKey,
    RecordSet, RequestToken, Result, SubmissionOutcome,
};
use crate::{log_batch_processing, log_transition};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

const MAX_LOGGED_BODY: usize = 200;

/// A token bound to the record that will redeem it
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAssignment {
    /// Record redeeming the token
    pub key: RecordKey,
    /// Token to redeem
    pub token: RequestToken,
    /// Whether the token redeems through the callback path
    pub use_callback: bool,
}

impl TokenAssignment {
    /// Creates an assignment
    pub fn new(key: RecordKey, token: RequestToken, use_callback: bool) -> Self {
        Self {
            key,
            token,
            use_callback,
        }
    }
}

/// What happened to the records of one redemption batch
#[derive(Debug, Default)]
pub struct RedemptionReport {
    /// Records that received a pseudonym, in completion order
    pub pseudonymized: Vec<RecordKey>,
    /// Records that ended in a defined failure state
    pub failed: Vec<RecordKey>,
    /// Records whose reply fell outside the defined outcomes
    pub errors: Vec<RecordErrorDetail>,
    /// Whether a shutdown signal stopped the batch early
    pub cancelled: bool,
}

impl RedemptionReport {
    /// Number of records that got a reply
    pub fn completed(&self) -> usize {
        self.pseudonymized.len() + self.failed.len() + self.errors.len()
    }
}

/// Interprets the reply to one identity submission
///
/// | Status | Outcome |
/// |---|---|
/// | 201 | pseudonym from the body, or from the token id on the callback path |
/// | 400 | identity invalid |
/// | 401 | token invalid or expired |
/// | 409 | identity conflict |
///
/// # Errors
///
/// Any other status is [`LinkageError::UnknownServiceResponse`]; a 201 without
/// a usable pseudonym is [`LinkageError::InvalidResponse`].
pub fn interpret_reply(
    reply: &SubmissionReply,
    token: &RequestToken,
    use_callback: bool,
) -> Result<SubmissionOutcome> {
    match reply.status {
        201 => {
            let (id, tentative) = match token.token_id().filter(|_| use_callback) {
                // the token id is the pseudonym; the body is informational only
                Some(token_id) => {
                    let tentative = reply
                        .created_id()
                        .ok()
                        .flatten()
                        .is_some_and(|body| body.tentative);
                    (token_id, tentative)
                }
                None => match reply.created_id()? {
                    Some(body) => (body.id_string, body.tentative),
                    None => {
                        return Err(LinkageError::InvalidResponse(
                            "201 reply carries no pseudonym".to_string(),
                        )
                        .into())
                    }
                },
            };
            let pseudonym = Pseudonym::new(id).map_err(LinkageError::InvalidResponse)?;
            Ok(SubmissionOutcome::Pseudonymized {
                pseudonym,
                tentative,
            })
        }
        400 => Ok(SubmissionOutcome::IdentityInvalid),
        401 => Ok(SubmissionOutcome::TokenInvalid),
        409 => Ok(SubmissionOutcome::IdentityConflict),
        status => Err(LinkageError::UnknownServiceResponse {
            status,
            message: reply.body.chars().take(MAX_LOGGED_BODY).collect(),
        }
        .into()),
    }
}

/// Submits identities and applies the resulting transitions
#[derive(Clone)]
pub struct PseudonymizationEngine {
    service: Arc<dyn RecordLinkageService>,
    max_concurrency: usize,
}

impl PseudonymizationEngine {
    /// Creates an engine running at most `max_concurrency` submissions at once
    pub fn new(service: Arc<dyn RecordLinkageService>, max_concurrency: usize) -> Self {
        Self {
            service,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Maximum number of submissions in flight
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Redeems one token with the record's identity
    ///
    /// # Errors
    ///
    /// Returns the transport error if the service was unreachable, or
    /// [`LinkageError::UnknownServiceResponse`] for a reply outside the
    /// defined outcomes. In both cases the status is left unchanged and the
    /// token is dropped.
    pub async fn pseudonymize(
        &self,
        record: &mut PatientRecord,
        token: RequestToken,
        use_callback: bool,
    ) -> Result<SubmissionOutcome> {
        record.assign_token(token.clone(), use_callback);
        let submission = IdentitySubmission::from_record(record);

        match self.service.submit_identity(&token, &submission).await {
            Ok(reply) => apply_reply(record, &token, use_callback, &reply),
            Err(e) => {
                record.discard_token();
                Err(e)
            }
        }
    }

    /// Redeems a batch of token assignments with bounded concurrency
    ///
    /// Token `i` is only ever redeemed by the record it is assigned to. If
    /// `shutdown` flips to `true`, in-flight submissions are abandoned; the
    /// transitions already applied stay.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an assignment names an unknown or
    /// repeated record key, and the transport error if the service became
    /// unreachable. Transitions applied before a transport failure stay.
    pub async fn pseudonymize_batch(
        &self,
        records: &mut RecordSet,
        assignments: Vec<TokenAssignment>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RedemptionReport> {
        let mut report = RedemptionReport::default();

        let mut unfinished: HashSet<RecordKey> = HashSet::with_capacity(assignments.len());
        for assignment in &assignments {
            if records.get(&assignment.key).is_none() {
                return Err(PseudonymizerError::Validation(format!(
                    "token assigned to unknown record {}",
                    assignment.key
                )));
            }
            if !unfinished.insert(assignment.key.clone()) {
                return Err(PseudonymizerError::Validation(format!(
                    "record {} assigned more than one token",
                    assignment.key
                )));
            }
        }

        if *shutdown.borrow() {
            report.cancelled = true;
            return Ok(report);
        }

        let total = assignments.len();
        let mut pending = Vec::with_capacity(total);
        for assignment in assignments {
            if let Some(record) = records.get_mut(&assignment.key) {
                record.assign_token(assignment.token.clone(), assignment.use_callback);
                let submission = IdentitySubmission::from_record(record);
                pending.push((assignment, submission));
            }
        }

        let service = Arc::clone(&self.service);
        let mut replies = stream::iter(pending.into_iter().map(|(assignment, submission)| {
            let service = Arc::clone(&service);
            async move {
                let reply = service.submit_identity(&assignment.token, &submission).await;
                (assignment, reply)
            }
        }))
        .buffer_unordered(self.max_concurrency);

        let mut watching = true;
        let mut transport_failure = None;

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed(), if watching => match changed {
                    Ok(()) if *shutdown.borrow() => {
                        tracing::warn!(
                            completed = report.completed(),
                            total = total,
                            "Shutdown requested, abandoning in-flight submissions"
                        );
                        report.cancelled = true;
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => watching = false,
                },

                next = replies.next() => {
                    let Some((assignment, reply)) = next else { break };
                    let key = assignment.key;
                    unfinished.remove(&key);

                    let Some(record) = records.get_mut(&key) else { continue };

                    match reply {
                        Ok(reply) => {
                            match apply_reply(record, &assignment.token, assignment.use_callback, &reply) {
                                Ok(SubmissionOutcome::Pseudonymized { .. }) => {
                                    report.pseudonymized.push(key)
                                }
                                Ok(_) => report.failed.push(key),
                                Err(e) => report.errors.push(
                                    RecordErrorDetail::new(e.to_string())
                                        .with_record_key(key.as_str())
                                        .with_status(reply.status),
                                ),
                            }
                        }
                        Err(e) => {
                            record.discard_token();
                            transport_failure = Some(e);
                            break;
                        }
                    }

                    log_batch_processing!(report.completed(), total);
                }
            }
        }

        // tokens of abandoned submissions may or may not have been consumed
        for key in &unfinished {
            if let Some(record) = records.get_mut(key) {
                record.discard_token();
            }
        }

        if let Some(e) = transport_failure {
            tracing::error!(
                error = %e,
                completed = report.completed(),
                total = total,
                "Record-linkage service unreachable, aborting batch"
            );
            return Err(e);
        }

        tracing::info!(
            total = total,
            pseudonymized = report.pseudonymized.len(),
            failed = report.failed.len(),
            unknown = report.errors.len(),
            cancelled = report.cancelled,
            "Redemption batch finished"
        );

        Ok(report)
    }
}

/// Interprets a reply and applies it to the record
///
/// Replies outside the defined outcomes leave the status unchanged and drop
/// the token.
fn apply_reply(
    record: &mut PatientRecord,
    token: &RequestToken,
    use_callback: bool,
    reply: &SubmissionReply,
) -> Result<SubmissionOutcome> {
    match interpret_reply(reply, token, use_callback) {
        Ok(outcome) => {
            let from = record.status();
            record.apply_outcome(&outcome);
            log_transition!(record.key(), from, record.status());
            if record.status().is_failure() {
                tracing::debug!(
                    record_key = %record.key(),
                    idat_fingerprint = %record.idat().fingerprint(),
                    status = %record.status(),
                    "Submission ended in failure state"
                );
            }
            Ok(outcome)
        }
        Err(e) => {
            record.discard_token();
            tracing::warn!(
                record_key = %record.key(),
                http_status = reply.status,
                error = %e,
                "Unexpected reply to identity submission"
            );
            Err(e)
        }
    }
}
