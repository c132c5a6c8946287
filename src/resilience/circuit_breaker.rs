//! # Circuit Breaker Implementation
//!
//! Classic three-state circuit breaker (Closed, Open, HalfOpen) with a
//! repeated-failures-over-time policy: the circuit opens only when the
//! configured number of consecutive failures all land inside a rolling time
//! window. Opening raises a critical alert exactly once per transition; a
//! single success anywhere resets the failure count.

use crate::alerting::SharedCriticalErrorSink;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - a trial call is allowed to test system health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Failure policy and recovery timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Rolling window the consecutive failures must fall within; a failure
    /// streak that outlives the window restarts the count
    pub failure_window: Duration,
    /// How long an open circuit waits before admitting a trial call
    pub cooldown: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: crate::constants::defaults::CIRCUIT_FAILURE_THRESHOLD,
            failure_window: crate::constants::defaults::CIRCUIT_FAILURE_WINDOW,
            cooldown: crate::constants::defaults::CIRCUIT_COOLDOWN,
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

/// Tracking state that is only touched under the mutex
#[derive(Debug, Default)]
struct FailureTracking {
    consecutive_failures: u32,
    first_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
}

/// Circuit breaker with atomic state management and windowed failure
/// counting
pub struct RepeatedFailureCircuitBreaker {
    /// Component name for logging and alerting
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Failure policy configuration
    settings: CircuitBreakerSettings,

    /// Failure tracking protected by mutex
    tracking: Mutex<FailureTracking>,

    /// Where open transitions raise their critical alert
    alerts: SharedCriticalErrorSink,
}

impl RepeatedFailureCircuitBreaker {
    /// Create a new circuit breaker for the named component
    pub fn new(
        name: String,
        settings: CircuitBreakerSettings,
        alerts: SharedCriticalErrorSink,
    ) -> Self {
        info!(
            component = %name,
            failure_threshold = settings.failure_threshold,
            failure_window_secs = settings.failure_window.as_secs(),
            cooldown_secs = settings.cooldown.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            settings,
            tracking: Mutex::new(FailureTracking::default()),
            alerts,
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.should_allow_call().await {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let result = operation().await;

        match &result {
            Ok(_) => self.record_success().await,
            Err(_) => self.record_failure().await,
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Time until an open circuit admits its trial call, if currently open
    pub async fn retry_after(&self) -> Option<Duration> {
        if self.state() != CircuitState::Open {
            return None;
        }
        let tracking = self.tracking.lock().await;
        tracking
            .opened_at
            .map(|opened| self.settings.cooldown.saturating_sub(opened.elapsed()))
    }

    async fn should_allow_call(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let mut tracking = self.tracking.lock().await;
                match tracking.opened_at {
                    Some(opened) if opened.elapsed() >= self.settings.cooldown => {
                        self.transition_to_half_open(&mut tracking);
                        true
                    }
                    Some(_) => false,
                    None => {
                        // Open without a timestamp - shouldn't happen, but allow the call
                        warn!(component = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                }
            }
        }
    }

    /// A single successful iteration resets the failure count
    async fn record_success(&self) {
        let mut tracking = self.tracking.lock().await;
        tracking.consecutive_failures = 0;
        tracking.first_failure_at = None;

        if self.state() == CircuitState::HalfOpen {
            tracking.opened_at = None;
            self.state
                .store(CircuitState::Closed as u8, Ordering::Release);
            info!(component = %self.name, "🟢 Circuit breaker closed (recovered)");
        }
    }

    async fn record_failure(&self) {
        let mut tracking = self.tracking.lock().await;
        let now = Instant::now();

        // A streak that outlived the rolling window restarts the count
        match tracking.first_failure_at {
            Some(first) if now.duration_since(first) <= self.settings.failure_window => {
                tracking.consecutive_failures += 1;
            }
            _ => {
                tracking.consecutive_failures = 1;
                tracking.first_failure_at = Some(now);
            }
        }

        debug!(
            component = %self.name,
            consecutive_failures = tracking.consecutive_failures,
            failure_threshold = self.settings.failure_threshold,
            "🔴 Iteration failed"
        );

        match self.state() {
            CircuitState::HalfOpen => {
                // Any failure during the trial immediately reopens
                self.transition_to_open(&mut tracking);
            }
            CircuitState::Closed => {
                if tracking.consecutive_failures >= self.settings.failure_threshold {
                    self.transition_to_open(&mut tracking);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Transition to open state (failing fast). Raises the critical alert
    /// exactly once per transition.
    fn transition_to_open(&self, tracking: &mut FailureTracking) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        tracking.opened_at = Some(Instant::now());

        error!(
            component = %self.name,
            consecutive_failures = tracking.consecutive_failures,
            cooldown_secs = self.settings.cooldown.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );

        self.alerts.raise(
            &self.name,
            &format!(
                "Repeated failures in {}: {} consecutive failures within {}s; suspending for {}s",
                self.name,
                tracking.consecutive_failures,
                self.settings.failure_window.as_secs(),
                self.settings.cooldown.as_secs()
            ),
        );
    }

    /// Transition to half-open state (testing recovery)
    fn transition_to_half_open(&self, tracking: &mut FailureTracking) {
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);
        tracking.consecutive_failures = 0;
        tracking.first_failure_at = None;

        info!(component = %self.name, "🟡 Circuit breaker half-open (testing recovery)");
    }
}

impl std::fmt::Debug for RepeatedFailureCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepeatedFailureCircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingAlertSink;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn breaker(
        threshold: u32,
        window: Duration,
        cooldown: Duration,
    ) -> (RepeatedFailureCircuitBreaker, Arc<RecordingAlertSink>) {
        let alerts = Arc::new(RecordingAlertSink::default());
        let settings = CircuitBreakerSettings {
            failure_threshold: threshold,
            failure_window: window,
            cooldown,
        };
        (
            RepeatedFailureCircuitBreaker::new("test".to_string(), settings, alerts.clone()),
            alerts,
        )
    }

    async fn fail(circuit: &RepeatedFailureCircuitBreaker) {
        let _ = circuit.call(|| async { Err::<(), _>("error") }).await;
    }

    #[tokio::test]
    async fn normal_operation_stays_closed() {
        let (circuit, alerts) = breaker(3, Duration::from_secs(60), Duration::from_millis(100));
        assert_eq!(circuit.state(), CircuitState::Closed);

        let result = circuit.call(|| async { Ok::<_, String>("success") }).await;
        assert!(result.is_ok());
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(alerts.raised().len(), 0);
    }

    #[tokio::test]
    async fn opens_after_threshold_and_alerts_once() {
        let (circuit, alerts) = breaker(2, Duration::from_secs(60), Duration::from_secs(5));

        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Closed);
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);
        assert_eq!(alerts.raised().len(), 1);

        // Calls fail fast while open, and no further alert fires
        let result = circuit
            .call(|| async { Ok::<_, String>("should not execute") })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert_eq!(alerts.raised().len(), 1);
    }

    #[tokio::test]
    async fn one_success_resets_the_failure_count() {
        let (circuit, alerts) = breaker(2, Duration::from_secs(60), Duration::from_secs(5));

        fail(&circuit).await;
        let _ = circuit.call(|| async { Ok::<_, String>("ok") }).await;
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(alerts.raised().len(), 0);
    }

    #[tokio::test]
    async fn failures_outside_the_window_restart_the_count() {
        let (circuit, _) = breaker(2, Duration::from_millis(40), Duration::from_secs(5));

        fail(&circuit).await;
        sleep(Duration::from_millis(60)).await;
        fail(&circuit).await;
        // The second failure started a new streak, so the circuit stays closed
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn recovers_through_half_open_after_cooldown() {
        let (circuit, alerts) = breaker(1, Duration::from_secs(60), Duration::from_millis(50));

        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;
        let result = circuit.call(|| async { Ok::<_, String>("success") }).await;
        assert!(result.is_ok());
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(alerts.raised().len(), 1);
    }

    #[tokio::test]
    async fn failed_trial_reopens_and_alerts_again() {
        let (circuit, alerts) = breaker(1, Duration::from_secs(60), Duration::from_millis(50));

        fail(&circuit).await;
        assert_eq!(alerts.raised().len(), 1);

        sleep(Duration::from_millis(60)).await;
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);
        // Reopening is a new open transition
        assert_eq!(alerts.raised().len(), 2);
    }
}
