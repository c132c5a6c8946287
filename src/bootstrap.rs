//! # Recoverability Bootstrap
//!
//! Composition root wiring the recoverability subsystems from configuration
//! and the host-supplied collaborators (durable store, messaging runtime,
//! integration publishers, alert sink). Everything is explicitly
//! constructed and dependency-injected here; there is no process-wide
//! static state and no runtime type scanning - the classifier set is the
//! list assembled at startup.

use crate::alerting::SharedCriticalErrorSink;
use crate::classification::{default_classifiers, FailureClassifier, FailureGroupingEngine};
use crate::config::RecoverabilityConfig;
use crate::dispatch::{EventDispatchLoop, IntegrationEventPublisher};
use crate::error::Result;
use crate::events::DomainEventBus;
use crate::messaging::{ControlMessage, MessageSession};
use crate::regrouping::{LegacyRegroupingSweep, ProcessOutcome, RegroupingProcessor, SweepOutcome};
use crate::retries::RetryOrchestrator;
use crate::storage::RecoverabilityStore;
use std::sync::Arc;
use tracing::info;

/// Fully wired recoverability core for one service instance
pub struct RecoverabilityCore {
    pub engine: Arc<FailureGroupingEngine>,
    pub orchestrator: Arc<RetryOrchestrator>,
    pub bus: DomainEventBus,
    sweep: LegacyRegroupingSweep,
    processor: RegroupingProcessor,
    dispatch: EventDispatchLoop,
}

impl RecoverabilityCore {
    /// Wire the core with the default classifier set.
    pub fn new(
        config: &RecoverabilityConfig,
        store: Arc<dyn RecoverabilityStore>,
        session: Arc<dyn MessageSession>,
        publishers: Vec<Arc<dyn IntegrationEventPublisher>>,
        alerts: SharedCriticalErrorSink,
    ) -> Result<Self> {
        Self::with_classifiers(config, store, session, publishers, alerts, default_classifiers())
    }

    /// Wire the core with an explicit classifier set. The order of the list
    /// is part of the classifier-set fingerprint.
    pub fn with_classifiers(
        config: &RecoverabilityConfig,
        store: Arc<dyn RecoverabilityStore>,
        session: Arc<dyn MessageSession>,
        publishers: Vec<Arc<dyn IntegrationEventPublisher>>,
        alerts: SharedCriticalErrorSink,
        classifiers: Vec<Arc<dyn FailureClassifier>>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(FailureGroupingEngine::new(classifiers));
        let orchestrator = Arc::new(RetryOrchestrator::new());
        let bus = DomainEventBus::default();

        let sweep = LegacyRegroupingSweep::new(store.clone(), session.clone(), engine.clone())
            .with_discovery_chunk_size(config.regrouping.discovery_chunk_size);
        let processor =
            RegroupingProcessor::new(store.clone(), session.clone(), engine.clone(), bus.clone())
                .with_batch_size(config.regrouping.batch_size);
        let dispatch = EventDispatchLoop::new(
            store,
            session,
            publishers,
            bus.clone(),
            alerts,
            config.dispatch.to_loop_settings(),
            config.circuit_breaker.to_settings(),
        );

        info!(
            fingerprint = %engine.fingerprint(),
            "🚀 Recoverability core wired"
        );

        Ok(Self {
            engine,
            orchestrator,
            bus,
            sweep,
            processor,
            dispatch,
        })
    }

    /// Start background work: kick the regrouping sweep's check phase, then
    /// start the dispatch loop.
    pub async fn start(&self) -> Result<SweepOutcome> {
        let sweep_outcome = self.sweep.check().await?;
        self.dispatch.start().await?;
        Ok(sweep_outcome)
    }

    /// Route one control message from the service's input queue.
    pub async fn handle_control_message(&self, message: &ControlMessage) -> Result<ProcessOutcome> {
        match message {
            ControlMessage::ContinueLegacyRegrouping { .. } => self.processor.process().await,
        }
    }

    /// Stop background work, draining any in-flight dispatch batch.
    pub async fn stop(&self) {
        self.dispatch.stop().await;
    }

    pub fn dispatch_loop(&self) -> &EventDispatchLoop {
        &self.dispatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::test_helpers::{failure_record, ContextEchoPublisher, RecordingAlertSink, RecordingSession};

    #[tokio::test]
    async fn core_starts_sweeps_and_stops() {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(RecordingSession::default());
        store
            .store_failures(&[failure_record("msg-1", "Boom")])
            .await
            .unwrap();

        let core = RecoverabilityCore::new(
            &RecoverabilityConfig::default(),
            store.clone(),
            session.clone(),
            vec![Arc::new(ContextEchoPublisher)],
            Arc::new(RecordingAlertSink::default()),
        )
        .unwrap();

        let outcome = core.start().await.unwrap();
        assert_eq!(outcome, SweepOutcome::SweepStarted { discovered: 1 });

        // the sweep enqueued a continuation; drive it the way the message
        // handler would
        let continuation = session.sent_local().pop().unwrap();
        let processed = core.handle_control_message(&continuation).await.unwrap();
        assert!(matches!(processed, ProcessOutcome::Completed { .. }));

        core.stop().await;
        assert!(!core.dispatch_loop().is_running());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_wiring_time() {
        let mut config = RecoverabilityConfig::default();
        config.dispatch.batch_size = 0;
        let result = RecoverabilityCore::new(
            &config,
            Arc::new(InMemoryStore::new()),
            Arc::new(RecordingSession::default()),
            vec![],
            Arc::new(RecordingAlertSink::default()),
        );
        assert!(result.is_err());
    }
}
