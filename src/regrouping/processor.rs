//! Processing phase of the legacy regrouping sweep.

use crate::classification::FailureGroupingEngine;
use crate::constants::{defaults, events};
use crate::error::Result;
use crate::events::DomainEventBus;
use crate::messaging::{ControlMessage, MessageSession};
use crate::storage::RecoverabilityStore;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// What one processing pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No batch document exists for the current fingerprint
    NoBatch,
    /// A batch was processed and a continuation was enqueued
    Continued { processed: usize },
    /// A batch was processed and the sweep is exhausted
    Completed { processed: usize },
}

/// Handles `ContinueLegacyRegrouping`: re-classifies one bounded batch of
/// failures per pass and re-enqueues itself until the store reports no more
/// work than the pass consumed.
pub struct RegroupingProcessor {
    store: Arc<dyn RecoverabilityStore>,
    session: Arc<dyn MessageSession>,
    engine: Arc<FailureGroupingEngine>,
    bus: DomainEventBus,
    batch_size: usize,
}

impl RegroupingProcessor {
    pub fn new(
        store: Arc<dyn RecoverabilityStore>,
        session: Arc<dyn MessageSession>,
        engine: Arc<FailureGroupingEngine>,
        bus: DomainEventBus,
    ) -> Self {
        Self {
            store,
            session,
            engine,
            bus,
            batch_size: defaults::REGROUPING_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run one processing pass for the current classifier-set fingerprint.
    pub async fn process(&self) -> Result<ProcessOutcome> {
        let fingerprint = self.engine.fingerprint();

        let Some(mut batch) = self.store.load_regrouping_batch(fingerprint).await? else {
            debug!(%fingerprint, "No regrouping batch outstanding");
            return Ok(ProcessOutcome::NoBatch);
        };

        // Progress bookkeeping: consume one chunk per pass. The document
        // itself stays alive until the sweep is exhausted - it is the
        // in-progress marker the continuation cycle runs on.
        let _chunk = batch.pop_first_chunk();

        // Group-less failures are the worst triage experience, so they fill
        // the batch first; failures merely missing newer classifiers take
        // the remaining capacity.
        let classifier_names = self.engine.classifier_names();
        let (no_group, no_group_stats) =
            self.store.failures_with_no_groups(self.batch_size).await?;
        let remaining_capacity = self.batch_size - no_group.len();
        let (missing, missing_stats) = self
            .store
            .failures_missing_classifiers(&classifier_names, remaining_capacity)
            .await?;

        let mut work = no_group;
        work.extend(missing);

        for failure in &mut work {
            let occurred_at = failure.latest_attempt().failure.time_of_failure;
            let groups = self.engine.enrich(&failure.classifiable(), occurred_at);
            failure.regroup(groups, fingerprint, classifier_names.clone());
        }

        // All-or-nothing: memberships and progress land together or not at all
        self.store.store_failures(&work).await?;

        let processed = work.len();
        let available = no_group_stats.total_results + missing_stats.total_results;

        let _ = self.bus.raise(
            events::REGROUPING_BATCH_COMPLETED,
            json!({ "fingerprint": fingerprint, "processed": processed }),
        );

        if available > processed as u64 {
            self.store.store_regrouping_batch(&batch).await?;
            self.session
                .send_local(ControlMessage::ContinueLegacyRegrouping {
                    fingerprint: fingerprint.to_string(),
                })
                .await?;
            debug!(%fingerprint, processed, available, "Regrouping pass complete; more work remains");
            return Ok(ProcessOutcome::Continued { processed });
        }

        self.store.delete_regrouping_batch(fingerprint).await?;
        let _ = self.bus.raise(
            events::REGROUPING_COMPLETED,
            json!({ "fingerprint": fingerprint }),
        );
        info!(%fingerprint, processed, "🧹 Legacy regrouping completed");
        Ok(ProcessOutcome::Completed { processed })
    }
}
