//! Integration tests for the legacy regrouping sweep: check phase and
//! processing phase wired together over the in-memory store, driven the way
//! the message handler would drive them.

use recoverability_core::classification::{
    default_classifiers, EndpointNameClassifier, ExceptionTypeAndStackTraceClassifier,
    FailureGroupingEngine, MessageTypeClassifier,
};
use recoverability_core::events::DomainEventBus;
use recoverability_core::messaging::ControlMessage;
use recoverability_core::regrouping::{
    LegacyRegroupingSweep, ProcessOutcome, RegroupingProcessor, SweepOutcome,
};
use recoverability_core::storage::{InMemoryStore, RecoverabilityStore};
use recoverability_core::test_helpers::{failure_record, RecordingSession};
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryStore>,
    session: Arc<RecordingSession>,
    sweep: LegacyRegroupingSweep,
    processor: RegroupingProcessor,
    fingerprint: String,
}

fn harness(engine: FailureGroupingEngine, batch_size: usize) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let session = Arc::new(RecordingSession::default());
    let engine = Arc::new(engine);
    let fingerprint = engine.fingerprint().to_string();
    let sweep = LegacyRegroupingSweep::new(store.clone(), session.clone(), engine.clone());
    let processor = RegroupingProcessor::new(
        store.clone(),
        session.clone(),
        engine,
        DomainEventBus::new(64),
    )
    .with_batch_size(batch_size);
    Harness {
        store,
        session,
        sweep,
        processor,
        fingerprint,
    }
}

/// Drive continuation messages to exhaustion, the way the message handler
/// would, with a hard cap so a regression cannot loop forever.
async fn drain(harness: &Harness) -> Vec<ProcessOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..50 {
        let outcome = harness.processor.process().await.unwrap();
        outcomes.push(outcome);
        if !matches!(outcome, ProcessOutcome::Continued { .. }) {
            break;
        }
    }
    outcomes
}

#[tokio::test]
async fn full_sweep_regroups_a_legacy_backlog() {
    let h = harness(FailureGroupingEngine::new(default_classifiers()), 3);
    let records: Vec<_> = (0..8)
        .map(|i| failure_record(&format!("msg-{i}"), "TimeoutException"))
        .collect();
    h.store.store_failures(&records).await.unwrap();

    assert_eq!(
        h.sweep.check().await.unwrap(),
        SweepOutcome::SweepStarted { discovered: 1 }
    );
    assert_eq!(
        h.session.sent_local()[0],
        ControlMessage::ContinueLegacyRegrouping {
            fingerprint: h.fingerprint.clone()
        }
    );

    let outcomes = drain(&h).await;
    assert!(matches!(
        outcomes.last().unwrap(),
        ProcessOutcome::Completed { .. }
    ));

    // every record is regrouped under the current fingerprint
    let ids: Vec<String> = (0..8).map(|i| format!("msg-{i}")).collect();
    for record in h.store.load_failures(&ids).await.unwrap() {
        assert!(!record.failure_groups.is_empty());
        assert_eq!(
            record.classifier_fingerprint.as_deref(),
            Some(h.fingerprint.as_str())
        );
    }

    // and the store reports nothing left to do
    let (stale, stats) = h
        .store
        .stale_fingerprint_failure_ids(&h.fingerprint, 10)
        .await
        .unwrap();
    assert!(stale.is_empty());
    assert_eq!(stats.total_results, 0);

    // the grouping view aggregates the shared groups across all records
    let views = h.store.failure_group_views().await.unwrap();
    let exception_view = views
        .iter()
        .find(|v| v.classifier_name == "exception-type-and-stack-trace")
        .unwrap();
    assert_eq!(exception_view.count, 8);
    assert!(exception_view.first <= exception_view.last);
}

#[tokio::test]
async fn sweep_is_idempotent_per_fingerprint() {
    let h = harness(FailureGroupingEngine::new(default_classifiers()), 10);
    h.store
        .store_failures(&[failure_record("msg-1", "Boom")])
        .await
        .unwrap();

    assert!(matches!(
        h.sweep.check().await.unwrap(),
        SweepOutcome::SweepStarted { .. }
    ));
    drain(&h).await;

    // second run against the unchanged classifier set does no work
    assert_eq!(h.sweep.check().await.unwrap(), SweepOutcome::AlreadySwept);
    assert_eq!(h.processor.process().await.unwrap(), ProcessOutcome::NoBatch);
}

#[tokio::test]
async fn growing_the_classifier_set_triggers_a_new_sweep() {
    // records first classified under a two-classifier set
    let reduced = FailureGroupingEngine::new(vec![
        Arc::new(ExceptionTypeAndStackTraceClassifier) as _,
        Arc::new(MessageTypeClassifier) as _,
    ]);
    let h1 = harness(reduced, 10);
    h1.store
        .store_failures(&[failure_record("msg-1", "Boom")])
        .await
        .unwrap();
    assert!(matches!(
        h1.sweep.check().await.unwrap(),
        SweepOutcome::SweepStarted { .. }
    ));
    drain(&h1).await;

    // the service restarts with an extra classifier registered; the same
    // store now holds records with a stale fingerprint
    let grown = FailureGroupingEngine::new(vec![
        Arc::new(ExceptionTypeAndStackTraceClassifier) as _,
        Arc::new(MessageTypeClassifier) as _,
        Arc::new(EndpointNameClassifier) as _,
    ]);
    let grown = Arc::new(grown);
    let session = Arc::new(RecordingSession::default());
    let sweep = LegacyRegroupingSweep::new(h1.store.clone(), session.clone(), grown.clone());
    let processor = RegroupingProcessor::new(
        h1.store.clone(),
        session,
        grown.clone(),
        DomainEventBus::new(64),
    );

    assert!(matches!(
        sweep.check().await.unwrap(),
        SweepOutcome::SweepStarted { .. }
    ));
    let mut last = processor.process().await.unwrap();
    while matches!(last, ProcessOutcome::Continued { .. }) {
        last = processor.process().await.unwrap();
    }

    let record = &h1.store.load_failures(&["msg-1".to_string()]).await.unwrap()[0];
    assert_eq!(
        record.classifier_fingerprint.as_deref(),
        Some(grown.fingerprint())
    );
    assert!(record.has_group_from("endpoint-name"));
}

#[tokio::test]
async fn discovery_chunk_yields_zero_ids_when_nothing_is_misgrouped() {
    let h = harness(FailureGroupingEngine::new(default_classifiers()), 10);
    assert_eq!(h.sweep.check().await.unwrap(), SweepOutcome::NothingStale);
    assert!(h.session.sent_local().is_empty());
}
