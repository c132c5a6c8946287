//! Check phase of the legacy regrouping sweep.

use crate::classification::FailureGroupingEngine;
use crate::constants::defaults;
use crate::error::Result;
use crate::messaging::{ControlMessage, MessageSession};
use crate::models::{RegroupingBatch, RegroupingSweepState};
use crate::storage::RecoverabilityStore;
use std::sync::Arc;
use tracing::{debug, info};

/// What the check phase decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// A sweep for the current fingerprint has already been started
    AlreadySwept,
    /// Sweep recorded, but no failure carries a stale fingerprint
    NothingStale,
    /// Stale failures detected; processing has been enqueued
    SweepStarted { discovered: usize },
}

/// Detects failures grouped under a stale classifier-set version and kicks
/// off their re-classification.
pub struct LegacyRegroupingSweep {
    store: Arc<dyn RecoverabilityStore>,
    session: Arc<dyn MessageSession>,
    engine: Arc<FailureGroupingEngine>,
    discovery_chunk_size: usize,
}

impl LegacyRegroupingSweep {
    pub fn new(
        store: Arc<dyn RecoverabilityStore>,
        session: Arc<dyn MessageSession>,
        engine: Arc<FailureGroupingEngine>,
    ) -> Self {
        Self {
            store,
            session,
            engine,
            discovery_chunk_size: defaults::REGROUPING_DISCOVERY_CHUNK_SIZE,
        }
    }

    pub fn with_discovery_chunk_size(mut self, chunk_size: usize) -> Self {
        self.discovery_chunk_size = chunk_size.max(1);
        self
    }

    /// Run the check phase once. Idempotent per classifier-set fingerprint:
    /// the persisted sweep-state marker short-circuits every later run.
    pub async fn check(&self) -> Result<SweepOutcome> {
        let fingerprint = self.engine.fingerprint();

        if self.store.load_sweep_state(fingerprint).await?.is_some() {
            debug!(%fingerprint, "Regrouping sweep already recorded; nothing to do");
            return Ok(SweepOutcome::AlreadySwept);
        }

        // Discovery only has to prove stale failures exist; the processing
        // phase re-queries with its own batching.
        let (stale_ids, stats) = self
            .store
            .stale_fingerprint_failure_ids(fingerprint, self.discovery_chunk_size)
            .await?;

        self.store
            .store_sweep_state(&RegroupingSweepState::new(fingerprint))
            .await?;

        if stale_ids.is_empty() {
            debug!(%fingerprint, "No failures grouped under a stale classifier set");
            return Ok(SweepOutcome::NothingStale);
        }

        let discovered = stale_ids.len();
        let batch = RegroupingBatch::new(fingerprint, stale_ids, self.discovery_chunk_size);
        self.store.store_regrouping_batch(&batch).await?;
        self.session
            .send_local(ControlMessage::ContinueLegacyRegrouping {
                fingerprint: fingerprint.to_string(),
            })
            .await?;

        info!(
            %fingerprint,
            discovered,
            total_stale = stats.total_results,
            "🧹 Legacy regrouping sweep started"
        );

        Ok(SweepOutcome::SweepStarted { discovered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::default_classifiers;
    use crate::storage::InMemoryStore;
    use crate::test_helpers::{failure_record, RecordingSession};

    fn sweep(
        store: Arc<InMemoryStore>,
        session: Arc<RecordingSession>,
    ) -> LegacyRegroupingSweep {
        let engine = Arc::new(FailureGroupingEngine::new(default_classifiers()));
        LegacyRegroupingSweep::new(store, session, engine)
    }

    #[tokio::test]
    async fn discovery_yields_one_id_when_failures_are_misgrouped() {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(RecordingSession::default());
        store
            .store_failures(&[
                failure_record("msg-1", "Boom"),
                failure_record("msg-2", "Boom"),
            ])
            .await
            .unwrap();

        let outcome = sweep(store.clone(), session.clone()).check().await.unwrap();

        assert_eq!(outcome, SweepOutcome::SweepStarted { discovered: 1 });
        assert_eq!(session.sent_local().len(), 1);
    }

    #[tokio::test]
    async fn second_check_against_same_fingerprint_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(RecordingSession::default());
        store
            .store_failures(&[failure_record("msg-1", "Boom")])
            .await
            .unwrap();

        let sweep = sweep(store, session.clone());
        assert!(matches!(
            sweep.check().await.unwrap(),
            SweepOutcome::SweepStarted { .. }
        ));
        assert_eq!(sweep.check().await.unwrap(), SweepOutcome::AlreadySwept);
        // no second continuation was enqueued
        assert_eq!(session.sent_local().len(), 1);
    }

    #[tokio::test]
    async fn check_with_nothing_stale_records_marker_without_enqueueing() {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(RecordingSession::default());

        let sweep = sweep(store.clone(), session.clone());
        assert_eq!(sweep.check().await.unwrap(), SweepOutcome::NothingStale);
        assert!(session.sent_local().is_empty());
        // the marker still makes the next run a no-op
        assert_eq!(sweep.check().await.unwrap(), SweepOutcome::AlreadySwept);
    }
}
