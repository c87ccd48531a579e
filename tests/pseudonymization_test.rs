//! Integration tests for the send/request protocol against an in-memory
//! record-linkage service

mod common;

use common::{record, record_set, FakeLinkageService};
use pseudonymizer::adapters::linkage::RecordLinkageService;
use pseudonymizer::adapters::storage::InMemoryMedicalDataStore;
use pseudonymizer::core::batch::{BatchOrchestrator, OrchestratorOptions};
use pseudonymizer::core::pseudonymization::{ConflictResolver, PseudonymizationEngine, TokenBroker};
use pseudonymizer::domain::{
    IdentifyingData, LinkageError, PatientStatus, Pseudonym, PseudonymizerError, RecordKey,
    RecordSet,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct Harness {
    service: Arc<FakeLinkageService>,
    store: Arc<InMemoryMedicalDataStore>,
    orchestrator: BatchOrchestrator,
    _shutdown_tx: watch::Sender<bool>,
}

fn harness_with(options: OrchestratorOptions) -> Harness {
    let service = Arc::new(FakeLinkageService::new());
    let store = Arc::new(InMemoryMedicalDataStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator =
        BatchOrchestrator::new(service.clone(), store.clone(), options, shutdown_rx);
    Harness {
        service,
        store,
        orchestrator,
        _shutdown_tx: shutdown_tx,
    }
}

fn harness() -> Harness {
    harness_with(OrchestratorOptions::default())
}

fn statuses(records: &RecordSet) -> HashSet<PatientStatus> {
    records.iter().map(|r| r.status()).collect()
}

fn pseudonyms(records: &RecordSet) -> Vec<Pseudonym> {
    records.iter().filter_map(|r| r.pseudonym().cloned()).collect()
}

fn key(s: &str) -> RecordKey {
    RecordKey::new(s).unwrap()
}

#[tokio::test]
async fn test_round_trip_112_records() {
    let h = harness();
    let mut records = record_set(112);
    let original = records.clone();

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.total_records, 112);
    assert_eq!(summary.submitted, 112);
    assert_eq!(summary.pseudonymized, 112);
    assert_eq!(summary.synced, 112);
    assert!(summary.is_successful());
    assert_eq!(summary.count(PatientStatus::Processed), 112);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Processed]));
    assert_eq!(h.service.issued_create_tokens(), 112);
    assert_eq!(h.service.issuance_calls(), 1);
    assert_eq!(h.store.len().await, 112);

    let requested = pseudonyms(&records);
    assert_eq!(requested.len(), 112);

    let outcome = h.orchestrator.request_records(&requested).await.unwrap();
    assert_eq!(outcome.records.len(), 112);
    assert!(outcome.invalid.is_empty());
    assert!(outcome.unresolved.is_empty());

    for sent in records.iter() {
        let pseudonym = sent.pseudonym().unwrap();
        let before = original.get(sent.key()).unwrap();
        let found = outcome.records.get(&key(pseudonym.as_str())).unwrap();

        assert_eq!(found.status(), PatientStatus::Found);
        assert_eq!(found.idat(), before.idat());
        assert_eq!(found.mdat(), before.mdat());
        assert_eq!(found.pseudonym(), Some(pseudonym));
    }
}

#[tokio::test]
async fn test_tokens_are_never_shared_between_records() {
    let h = harness();
    let mut records = record_set(40);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    let mut owners: HashMap<String, HashSet<String>> = HashMap::new();
    for (token, identity) in h.service.submissions() {
        owners.entry(token).or_default().insert(identity);
    }

    assert_eq!(owners.len(), 40);
    assert!(owners.values().all(|identities| identities.len() == 1));

    let distinct: HashSet<&Pseudonym> = records.iter().filter_map(|r| r.pseudonym()).collect();
    assert_eq!(distinct.len(), 40);
}

#[tokio::test]
async fn test_expired_tokens_are_replaced_on_next_call() {
    let h = harness();
    let mut records = record_set(5);
    h.service.set_expire_tokens(true);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(statuses(&records), HashSet::from([PatientStatus::TokenInvalid]));
    assert!(records.iter().all(|r| r.active_token().is_none()));
    assert_eq!(summary.failed(), 5);
    assert_eq!(summary.synced, 0);
    assert!(!summary.is_successful());
    assert!(h.store.is_empty().await);

    h.service.set_expire_tokens(false);
    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.resolution_attempts, 5);
    assert_eq!(summary.pseudonymized, 5);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Processed]));
    assert_eq!(h.service.issued_create_tokens(), 10);
}

#[tokio::test]
async fn test_conflict_is_resubmitted_with_retained_token() {
    let h = harness();
    let mut records = RecordSet::from_records(vec![record("row-1", "Erika", "Mustermann")]).unwrap();
    h.service.force_statuses("Erika", &[409]);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    let conflicted = records.get(&key("row-1")).unwrap();
    assert_eq!(conflicted.status(), PatientStatus::IdatConflict);
    assert!(conflicted.active_token().is_some());

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::Processed
    );
    let submissions = h.service.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].0, submissions[1].0);
    assert_eq!(h.service.issued_create_tokens(), 1);
}

#[tokio::test]
async fn test_invalid_identity_waits_for_correction() {
    let h = harness();
    let mut records = RecordSet::from_records(vec![record("row-1", "Erika", "Mustermann")]).unwrap();
    h.service.force_statuses("Erika", &[400]);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::IdatInvalid
    );

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    assert_eq!(summary.resolution_attempts, 1);
    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::IdatInvalid
    );
    assert_eq!(h.service.submissions().len(), 1);

    let corrected = IdentifyingData::new(
        "Erika",
        "Musterfrau",
        chrono::NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
    )
    .unwrap();
    let record = records.get_mut(&key("row-1")).unwrap();
    record.set_idat(corrected);
    assert_eq!(record.status(), PatientStatus::IdatInvalid);
    assert!(record.active_token().is_some());

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::Processed
    );

    // the corrected identity redeems the token the rejected one kept
    let submissions = h.service.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].0, submissions[1].0);
    assert!(submissions[1].1.contains("Musterfrau"));
    assert_eq!(h.service.issued_create_tokens(), 1);
}

#[tokio::test]
async fn test_invalid_identity_resubmitted_after_sureness_change() {
    let h = harness();
    let mut records = RecordSet::from_records(vec![record("row-1", "Erika", "Mustermann")]).unwrap();
    h.service.force_statuses("Erika", &[400]);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    let record = records.get_mut(&key("row-1")).unwrap();
    assert_eq!(record.status(), PatientStatus::IdatInvalid);
    record.set_sureness(true);
    assert_eq!(record.status(), PatientStatus::IdatInvalid);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.pseudonymized, 1);
    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::Processed
    );
    assert_eq!(h.service.submissions().len(), 2);
    assert_eq!(h.service.issued_create_tokens(), 1);
}

#[tokio::test]
async fn test_resolution_pass_runs_once() {
    let h = harness();
    let mut records = RecordSet::from_records(vec![
        record("row-1", "Max", "Mustermann"),
        record("row-2", "Anna", "Schmidt"),
    ])
    .unwrap();
    h.service.force_statuses("Max", &[409, 409, 409, 409]);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    assert_eq!(h.service.submissions().len(), 2);

    let service: Arc<dyn RecordLinkageService> = h.service.clone();
    let broker = TokenBroker::new(service.clone());
    let resolver = ConflictResolver::new(broker, PseudonymizationEngine::new(service, 2));
    let (_tx, rx) = watch::channel(false);

    let outcome = resolver
        .resolve(&mut records, &[key("row-1"), key("row-2")], rx)
        .await
        .unwrap();

    // row-2 already holds a pseudonym and is left alone
    assert_eq!(outcome.unresolved, vec![key("row-1")]);
    assert!(outcome.pseudonymized.is_empty());
    assert_eq!(h.service.submissions().len(), 3);
    assert_eq!(
        records.get(&key("row-1")).unwrap().status(),
        PatientStatus::IdatConflict
    );
}

#[tokio::test]
async fn test_unknown_reply_is_recorded_and_token_dropped() {
    let h = harness();
    let mut records = RecordSet::from_records(vec![record("row-1", "Erika", "Mustermann")]).unwrap();
    h.service.force_statuses("Erika", &[500]);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].status, Some(500));
    assert_eq!(summary.errors[0].record_key.as_deref(), Some("row-1"));
    let record = records.get(&key("row-1")).unwrap();
    assert_eq!(record.status(), PatientStatus::Created);
    assert!(record.active_token().is_none());
}

#[tokio::test]
async fn test_token_count_mismatch_aborts_batch() {
    let h = harness();
    let mut records = record_set(3);
    h.service.set_short_issue(true);

    let err = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PseudonymizerError::Linkage(LinkageError::TokenCountMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert!(h.service.submissions().is_empty());
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Created]));
}

#[tokio::test]
async fn test_unreachable_service_aborts_batch() {
    let h = harness();
    let mut records = record_set(3);
    h.service.set_unreachable(true);

    let err = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Created]));
}

#[tokio::test]
async fn test_callback_path_uses_token_id() {
    let h = harness();
    let mut records = record_set(3);
    h.service.set_use_callback(true);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Processed]));
    assert!(records
        .iter()
        .all(|r| r.pseudonym().unwrap().as_str().starts_with('c')));
}

#[tokio::test]
async fn test_storage_failure_marks_not_processed_and_retries() {
    let h = harness();
    let mut records = record_set(4);
    h.store.set_unavailable(true);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.sync_failed, 4);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::NotProcessed]));

    h.store.set_unavailable(false);
    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert_eq!(summary.synced, 4);
    assert_eq!(summary.submitted, 0);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Processed]));
    assert_eq!(h.service.issued_create_tokens(), 4);
}

#[tokio::test]
async fn test_retry_succeeded_resends_synced_records() {
    let h = harness();
    let mut records = record_set(2);

    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    h.store.set_unavailable(true);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();
    assert_eq!(summary.sync_failed, 0);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Processed]));

    let summary = h
        .orchestrator
        .send_records(&mut records, true)
        .await
        .unwrap();
    assert_eq!(summary.sync_failed, 2);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::NotProcessed]));
}

#[tokio::test]
async fn test_dry_run_skips_medical_data() {
    let h = harness_with(OrchestratorOptions {
        dry_run: true,
        ..OrchestratorOptions::default()
    });
    let mut records = record_set(3);

    let summary = h
        .orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.pseudonymized, 3);
    assert_eq!(summary.synced, 0);
    assert!(h.store.is_empty().await);
    assert_eq!(statuses(&records), HashSet::from([PatientStatus::Pseudonymized]));

    // identities resolve, but there is no medical data to find
    let outcome = h
        .orchestrator
        .request_records(&pseudonyms(&records))
        .await
        .unwrap();
    assert_eq!(outcome.records.len(), 3);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.status() == PatientStatus::NotFound));
}

#[tokio::test]
async fn test_duplicate_pseudonyms_are_resolved_once() {
    let h = harness();
    let mut records = record_set(3);
    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    let all = pseudonyms(&records);
    let requested = vec![
        all[0].clone(),
        all[0].clone(),
        all[1].clone(),
        all[0].clone(),
    ];

    let outcome = h.orchestrator.request_records(&requested).await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(h.service.read_issuance_calls(), 1);
}

#[tokio::test]
async fn test_unknown_and_corrupt_pseudonyms_are_reported() {
    let h = harness();
    let mut records = record_set(2);
    h.orchestrator
        .send_records(&mut records, false)
        .await
        .unwrap();

    let all = pseudonyms(&records);
    h.service.corrupt_identity(&all[1]);
    let unknown = Pseudonym::new("NOPE0001").unwrap();

    let outcome = h
        .orchestrator
        .request_records(&[all[0].clone(), unknown.clone(), all[1].clone()])
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.invalid, vec![unknown]);
    assert_eq!(outcome.unresolved, vec![all[1].clone()]);
}

#[tokio::test]
async fn test_request_with_only_unknown_pseudonyms() {
    let h = harness();
    let unknown = Pseudonym::new("NOPE0001").unwrap();

    let outcome = h
        .orchestrator
        .request_records(&[unknown.clone()])
        .await
        .unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.invalid, vec![unknown]);
}

#[tokio::test]
async fn test_empty_request_skips_service() {
    let h = harness();

    let outcome = h.orchestrator.request_records(&[]).await.unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(h.service.read_issuance_calls(), 0);
}
