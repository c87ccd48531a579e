//! Shared fixtures for integration tests
//!
//! `FakeLinkageService` behaves like a Mainzelliste instance held in memory:
//! create tokens are single-use, read tokens are bound to the pseudonyms they
//! were issued for, and a known identity gets its existing pseudonym back.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use pseudonymizer::adapters::linkage::{
    CreateTokens, IdString, IdentityEntry, IdentityFields, IdentitySubmission, ReadGrant,
    RecordLinkageService, SubmissionReply,
};
use pseudonymizer::domain::{
    IdentifyingData, LinkageError, PatientRecord, Pseudonym, RecordSet, RequestToken, Result,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

const BASE_URL: &str = "http://mainzelliste.test";

#[derive(Default)]
struct FakeState {
    next_token: u64,
    next_pid: u64,
    open_create_tokens: HashSet<String>,
    read_tokens: HashMap<String, Vec<String>>,
    patients: Vec<(IdentitySubmission, String)>,
    redeemed: Vec<(String, String)>,
    issued_create_tokens: usize,
    issuance_calls: usize,
    read_issuance_calls: usize,
    expire_tokens: bool,
    use_callback: bool,
    short_issue: bool,
    unreachable: bool,
    forced: HashMap<String, Vec<u16>>,
    corrupted: HashSet<String>,
}

/// In-memory record-linkage service
#[derive(Default)]
pub struct FakeLinkageService {
    state: Mutex<FakeState>,
    submit_delay: Mutex<Option<Duration>>,
}

impl FakeLinkageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every outstanding and future create token is treated as expired
    pub fn set_expire_tokens(&self, expire: bool) {
        self.state.lock().unwrap().expire_tokens = expire;
    }

    /// Redeem create tokens through the callback path
    pub fn set_use_callback(&self, use_callback: bool) {
        self.state.lock().unwrap().use_callback = use_callback;
    }

    /// Issue one token fewer than requested
    pub fn set_short_issue(&self, short: bool) {
        self.state.lock().unwrap().short_issue = short;
    }

    /// Fail every call with a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Delay each identity submission
    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    /// Answer the next submissions for `firstname` with the given statuses, in order
    pub fn force_statuses(&self, firstname: &str, statuses: &[u16]) {
        self.state
            .lock()
            .unwrap()
            .forced
            .insert(firstname.to_string(), statuses.to_vec());
    }

    /// Return unparseable identity fields for this pseudonym on reads
    pub fn corrupt_identity(&self, pseudonym: &Pseudonym) {
        self.state
            .lock()
            .unwrap()
            .corrupted
            .insert(pseudonym.as_str().to_string());
    }

    /// Total number of create tokens handed out
    pub fn issued_create_tokens(&self) -> usize {
        self.state.lock().unwrap().issued_create_tokens
    }

    /// Number of create-token issuance round trips
    pub fn issuance_calls(&self) -> usize {
        self.state.lock().unwrap().issuance_calls
    }

    /// Number of read-token issuance round trips
    pub fn read_issuance_calls(&self) -> usize {
        self.state.lock().unwrap().read_issuance_calls
    }

    /// Token id and identity of every submission received, in arrival order
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().redeemed.clone()
    }

    /// Number of distinct patients known to the service
    pub fn patient_count(&self) -> usize {
        self.state.lock().unwrap().patients.len()
    }

    fn transport_check(&self) -> Result<()> {
        if self.state.lock().unwrap().unreachable {
            return Err(LinkageError::TransportUnavailable("connection refused".into()).into());
        }
        Ok(())
    }

    fn token_url(id: &str) -> RequestToken {
        RequestToken::new(format!("{BASE_URL}/patients?tokenId={id}")).unwrap()
    }

    fn redeem(&self, token: &RequestToken, submission: &IdentitySubmission) -> SubmissionReply {
        let mut state = self.state.lock().unwrap();
        let token_id = token.token_id().unwrap_or_default();
        state
            .redeemed
            .push((token_id.clone(), identity_key(submission)));

        // a token is only used up by a successful submission
        if !state.open_create_tokens.contains(&token_id) || state.expire_tokens {
            state.open_create_tokens.remove(&token_id);
            return SubmissionReply::new(401, "Please supply a valid 'addPatient' token.");
        }

        if let Some(queue) = state.forced.get_mut(&submission.firstname) {
            if !queue.is_empty() {
                let status = queue.remove(0);
                return SubmissionReply::new(status, format!("forced {status}"));
            }
        }

        let existing = state
            .patients
            .iter()
            .find(|(known, _)| same_identity(known, submission))
            .map(|(_, pid)| pid.clone());

        state.open_create_tokens.remove(&token_id);
        let pid = match existing {
            Some(pid) => pid,
            None => {
                let pid = if state.use_callback {
                    token_id.clone()
                } else {
                    state.next_pid += 1;
                    format!("PID{:05}", state.next_pid)
                };
                state.patients.push((submission.clone(), pid.clone()));
                pid
            }
        };

        if state.use_callback {
            SubmissionReply::new(201, "")
        } else {
            SubmissionReply::new(
                201,
                format!(r#"[{{"idString":"{pid}","tentative":false}}]"#),
            )
        }
    }
}

fn identity_key(s: &IdentitySubmission) -> String {
    format!("{}|{}|{}-{}-{}", s.firstname, s.lastname, s.year, s.month, s.day)
}

fn same_identity(a: &IdentitySubmission, b: &IdentitySubmission) -> bool {
    a.firstname == b.firstname
        && a.lastname == b.lastname
        && a.day == b.day
        && a.month == b.month
        && a.year == b.year
}

#[async_trait]
impl RecordLinkageService for FakeLinkageService {
    async fn issue_create_tokens(&self, count: usize) -> Result<CreateTokens> {
        self.transport_check()?;
        let mut state = self.state.lock().unwrap();
        state.issuance_calls += 1;

        let count = if state.short_issue {
            count.saturating_sub(1)
        } else {
            count
        };

        let mut tokens = Vec::with_capacity(count);
        for _ in 0..count {
            state.next_token += 1;
            let id = format!("c{}", state.next_token);
            state.open_create_tokens.insert(id.clone());
            tokens.push(Self::token_url(&id));
        }
        state.issued_create_tokens += count;

        Ok(CreateTokens {
            tokens,
            use_callback: state.use_callback,
        })
    }

    async fn issue_read_token(&self, pseudonyms: &[Pseudonym]) -> Result<ReadGrant> {
        self.transport_check()?;
        let mut state = self.state.lock().unwrap();
        state.read_issuance_calls += 1;

        let known: HashSet<&str> = state.patients.iter().map(|(_, pid)| pid.as_str()).collect();
        let (valid, invalid): (Vec<&Pseudonym>, Vec<&Pseudonym>) = pseudonyms
            .iter()
            .partition(|p| known.contains(p.as_str()));
        let valid: Vec<String> = valid.iter().map(|p| p.as_str().to_string()).collect();
        let invalid: Vec<Pseudonym> = invalid.into_iter().cloned().collect();

        state.next_token += 1;
        let id = format!("r{}", state.next_token);
        state.read_tokens.insert(id.clone(), valid);

        Ok(ReadGrant {
            token: Self::token_url(&id),
            invalid,
        })
    }

    async fn submit_identity(
        &self,
        token: &RequestToken,
        submission: &IdentitySubmission,
    ) -> Result<SubmissionReply> {
        self.transport_check()?;
        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.redeem(token, submission))
    }

    async fn read_identities(&self, token: &RequestToken) -> Result<Vec<IdentityEntry>> {
        self.transport_check()?;
        let state = self.state.lock().unwrap();
        let token_id = token.token_id().unwrap_or_default();
        let Some(pids) = state.read_tokens.get(&token_id) else {
            return Err(LinkageError::UnknownServiceResponse {
                status: 401,
                message: "unknown read token".into(),
            }
            .into());
        };

        Ok(pids
            .iter()
            .filter_map(|pid| {
                state
                    .patients
                    .iter()
                    .find(|(_, known)| known == pid)
                    .map(|(submission, pid)| {
                        let mut fields = IdentityFields {
                            firstname: submission.firstname.clone(),
                            lastname: submission.lastname.clone(),
                            day: submission.day.clone(),
                            month: submission.month.clone(),
                            year: submission.year.clone(),
                        };
                        if state.corrupted.contains(pid) {
                            fields.month = "13".to_string();
                        }
                        IdentityEntry {
                            fields,
                            ids: vec![IdString {
                                id_string: pid.clone(),
                                tentative: false,
                            }],
                        }
                    })
            })
            .collect())
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }
}

/// A generated identity with a birthdate unique to `index`
pub fn fake_identity(index: usize) -> IdentifyingData {
    let firstname: String = FirstName().fake();
    let lastname: String = LastName().fake();
    let birthdate = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap()
        + ChronoDuration::days(index as i64 * 97);
    IdentifyingData::new(&firstname, &lastname, birthdate).unwrap()
}

/// Medical payload for record `index`
pub fn fake_mdat(index: usize) -> String {
    format!(r#"{{"visit":{index},"diagnosis":"J45.{}"}}"#, index % 10)
}

/// A record set of `count` fresh records with generated identities
pub fn record_set(count: usize) -> RecordSet {
    let records = (0..count)
        .map(|i| {
            PatientRecord::builder()
                .key(format!("row-{i}"))
                .unwrap()
                .idat(fake_identity(i))
                .mdat(fake_mdat(i))
                .build()
                .unwrap()
        })
        .collect();
    RecordSet::from_records(records).unwrap()
}

/// A single fresh record with a fixed identity
pub fn record(key: &str, firstname: &str, lastname: &str) -> PatientRecord {
    PatientRecord::builder()
        .key(key)
        .unwrap()
        .idat(
            IdentifyingData::new(
                firstname,
                lastname,
                NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            )
            .unwrap(),
        )
        .mdat(format!(r#"{{"owner":"{key}"}}"#))
        .build()
        .unwrap()
}
