//! # Event Dispatch Loop
//!
//! The resilient background loop that publishes queued dispatch requests to
//! external integrations.
//!
//! ## Loop body
//!
//! Every iteration runs under the circuit breaker: pull a bounded batch of
//! pending requests; when non-empty, derive events through every registered
//! publisher, publish them (isolating per-event failures), delete the
//! consumed requests, and insert a short delay before the next pull. When
//! the pull comes back empty, the loop first compares the store's index
//! watermark against the last change sequence observed on the feed - a
//! lagging index means work may be under-reported, so it retries
//! immediately - and otherwise blocks on one merged wait point: change
//! notification, fallback timeout, or shutdown.
//!
//! ## Shutdown
//!
//! `stop()` is cooperative: it clears the running flag, wakes every wait
//! point, and awaits the loop task so no in-flight batch is abandoned
//! mid-publish.

use crate::alerting::SharedCriticalErrorSink;
use crate::constants::{events, prefixes};
use crate::dispatch::IntegrationEventPublisher;
use crate::error::{RecoverabilityError, Result};
use crate::events::DomainEventBus;
use crate::messaging::MessageSession;
use crate::models::DispatchContext;
use crate::resilience::{CircuitBreakerError, CircuitBreakerSettings, RepeatedFailureCircuitBreaker};
use crate::storage::{DocumentChange, RecoverabilityStore};
use futures::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Loop tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct DispatchLoopSettings {
    /// Maximum requests pulled per pass
    pub batch_size: usize,
    /// Fixed delay after a non-empty pass (more work is likely)
    pub batch_delay: Duration,
    /// Fallback wake-up interval while blocked on the change feed
    pub wake_timeout: Duration,
}

impl Default for DispatchLoopSettings {
    fn default() -> Self {
        Self {
            batch_size: crate::constants::defaults::DISPATCH_BATCH_SIZE,
            batch_delay: crate::constants::defaults::DISPATCH_BATCH_DELAY,
            wake_timeout: crate::constants::defaults::DISPATCH_WAKE_TIMEOUT,
        }
    }
}

/// Result of one dispatch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing pending
    Empty,
    /// A batch was consumed
    Dispatched {
        requests: usize,
        events_published: usize,
        events_failed: usize,
    },
}

/// Shared state between the loop task and its handle
struct DispatchState {
    store: Arc<dyn RecoverabilityStore>,
    session: Arc<dyn MessageSession>,
    publishers: Vec<Arc<dyn IntegrationEventPublisher>>,
    bus: DomainEventBus,
    breaker: RepeatedFailureCircuitBreaker,
    settings: DispatchLoopSettings,
    running: AtomicBool,
    shutdown_notify: Notify,
    /// Highest change sequence seen on the feed; compared against the
    /// store's index watermark to detect under-reported work
    last_observed_sequence: AtomicU64,
}

/// Change-feed-driven dispatcher of pending requests to external
/// integrations. One instance owns one background task.
pub struct EventDispatchLoop {
    state: Arc<DispatchState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatchLoop {
    pub fn new(
        store: Arc<dyn RecoverabilityStore>,
        session: Arc<dyn MessageSession>,
        publishers: Vec<Arc<dyn IntegrationEventPublisher>>,
        bus: DomainEventBus,
        alerts: SharedCriticalErrorSink,
        settings: DispatchLoopSettings,
        breaker_settings: CircuitBreakerSettings,
    ) -> Self {
        let breaker = RepeatedFailureCircuitBreaker::new(
            "event_dispatch".to_string(),
            breaker_settings,
            alerts,
        );
        Self {
            state: Arc::new(DispatchState {
                store,
                session,
                publishers,
                bus,
                breaker,
                settings,
                running: AtomicBool::new(false),
                shutdown_notify: Notify::new(),
                last_observed_sequence: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Subscribe to the change feed and start the background task. The
    /// first iteration runs immediately to catch up on anything already
    /// queued.
    pub async fn start(&self) -> Result<()> {
        if self.state.running.swap(true, Ordering::AcqRel) {
            return Err(RecoverabilityError::InvalidState(
                "Event dispatch loop is already running".to_string(),
            ));
        }

        // Subscribe before the catch-up pass so no creation slips between
        // the pass and the subscription.
        let changes = self
            .state
            .store
            .subscribe_changes(prefixes::PENDING_DISPATCH_REQUESTS);

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            run(state, changes).await;
        });
        *self.handle.lock().await = Some(task);

        info!("▶️ Event dispatch loop started");
        Ok(())
    }

    /// Stop the loop and await the task; the in-flight pass is drained
    /// before this returns.
    pub async fn stop(&self) {
        if !self.state.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.state.shutdown_notify.notify_waiters();

        if let Some(task) = self.handle.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Dispatch loop task ended abnormally");
            }
        }
        info!("⏹️ Event dispatch loop stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Current circuit state, exposed for health reporting
    pub fn circuit_state(&self) -> crate::resilience::CircuitState {
        self.state.breaker.state()
    }

    #[cfg(test)]
    fn test_state(&self) -> &Arc<DispatchState> {
        &self.state
    }
}

async fn run(state: Arc<DispatchState>, mut changes: broadcast::Receiver<DocumentChange>) {
    while state.running.load(Ordering::Acquire) {
        state.drain_observed_changes(&mut changes);

        match state.breaker.call(|| state.dispatch_pass()).await {
            Ok(PassOutcome::Dispatched {
                requests,
                events_published,
                events_failed,
            }) => {
                debug!(
                    requests,
                    events_published, events_failed, "Dispatch pass consumed a batch"
                );
                // More work is likely right behind a full batch
                state.interruptible_sleep(state.settings.batch_delay).await;
            }
            Ok(PassOutcome::Empty) => {
                if state.index_may_under_report().await {
                    // The index has not caught up with observed changes;
                    // re-query instead of sleeping on a stale view.
                    continue;
                }
                state.wait_for_work(&mut changes).await;
            }
            Err(CircuitBreakerError::CircuitOpen { .. }) => {
                let cooldown = state
                    .breaker
                    .retry_after()
                    .await
                    .unwrap_or(Duration::from_secs(1));
                warn!(
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Dispatch circuit open; suspending until cooldown"
                );
                state.interruptible_sleep(cooldown).await;
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                error!(error = %e, "Dispatch iteration failed");
            }
        }
    }
    debug!("Dispatch loop exiting");
}

impl DispatchState {
    /// One breaker-protected iteration: pull, derive, publish, delete.
    async fn dispatch_pass(&self) -> Result<PassOutcome> {
        let requests = self
            .store
            .pending_dispatch_requests(self.settings.batch_size)
            .await?;
        if requests.is_empty() {
            return Ok(PassOutcome::Empty);
        }

        let contexts: Vec<DispatchContext> = requests
            .iter()
            .map(|r| r.dispatch_context.clone())
            .collect();

        // Publishers derive independently over the same batch. Derivation
        // errors are iteration-level: they abort the pass and count against
        // the breaker.
        let contexts_ref = &contexts;
        let derivations = join_all(self.publishers.iter().map(|publisher| async move {
            publisher.publish_events(contexts_ref).await.map_err(|e| {
                RecoverabilityError::DispatchError(format!(
                    "publisher {} failed to derive events: {e:#}",
                    publisher.name()
                ))
            })
        }))
        .await;
        let mut derived = Vec::new();
        for events in derivations {
            derived.extend(events?);
        }

        // Per-event publish failures are isolated: each one becomes a
        // dispatch-failed notification and the batch keeps going.
        let mut events_published = 0usize;
        let mut events_failed = 0usize;
        for event in derived {
            let event_type = event.event_type.clone();
            match self.session.publish(event).await {
                Ok(()) => events_published += 1,
                Err(e) => {
                    events_failed += 1;
                    let reason = publish_failure_reason(&e);
                    warn!(event_type = %event_type, reason = %reason, "Integration event failed to publish");
                    let _ = self.bus.raise(
                        events::EXTERNAL_EVENT_PUBLISH_FAILED,
                        json!({ "event_type": event_type, "reason": reason }),
                    );
                }
            }
        }

        // All publish attempts are complete; the batch is consumed either way.
        let ids: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
        self.store.delete_dispatch_requests(&ids).await?;

        Ok(PassOutcome::Dispatched {
            requests: ids.len(),
            events_published,
            events_failed,
        })
    }

    /// Record every buffered change-feed notification without blocking.
    fn drain_observed_changes(&self, changes: &mut broadcast::Receiver<DocumentChange>) {
        loop {
            match changes.try_recv() {
                Ok(change) => self.observe_sequence(change.sequence),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    debug!(missed, "Change feed lagged; continuing from newest");
                }
                Err(_) => break,
            }
        }
    }

    fn observe_sequence(&self, sequence: u64) {
        self.last_observed_sequence
            .fetch_max(sequence, Ordering::AcqRel);
    }

    /// Whether the store's index trails the change feed, meaning an empty
    /// pull may have under-reported pending work.
    async fn index_may_under_report(&self) -> bool {
        let observed = self.last_observed_sequence.load(Ordering::Acquire);
        match self.store.index_watermark().await {
            Ok(watermark) => watermark < observed,
            Err(e) => {
                warn!(error = %e, "Failed to read index watermark; assuming caught up");
                false
            }
        }
    }

    /// Merged wait point: change notification, fallback timeout, or
    /// shutdown - whichever comes first.
    async fn wait_for_work(&self, changes: &mut broadcast::Receiver<DocumentChange>) {
        tokio::select! {
            received = changes.recv() => {
                match received {
                    Ok(change) => self.observe_sequence(change.sequence),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "Change feed lagged while waiting");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Store dropped the feed; the fallback timeout keeps
                        // the loop alive on the next iteration.
                        self.interruptible_sleep(self.settings.wake_timeout).await;
                    }
                }
            }
            () = tokio::time::sleep(self.settings.wake_timeout) => {
                debug!("Fallback wake-up; re-checking for pending dispatch requests");
            }
            () = self.shutdown_notify.notified() => {}
        }
    }

    async fn interruptible_sleep(&self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.shutdown_notify.notified() => {}
        }
    }
}

/// Best-effort reason string for a failed publish; never empty.
fn publish_failure_reason(error: &RecoverabilityError) -> String {
    let reason = error.to_string();
    if reason.trim().is_empty() {
        "Failed to publish integration event".to_string()
    } else {
        reason
    }
}
