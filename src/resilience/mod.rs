//! # Resilience Module
//!
//! Circuit breaker protection for the background loops. The dispatch loop
//! wraps every iteration in a [`RepeatedFailureCircuitBreaker`]: repeated
//! iteration-level failures inside a rolling window open the circuit, raise
//! one critical alert per open transition, and suspend work until a
//! cooldown admits a trial iteration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use recoverability_core::alerting::LogCriticalErrorSink;
//! use recoverability_core::resilience::{
//!     CircuitBreakerSettings, RepeatedFailureCircuitBreaker,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let settings = CircuitBreakerSettings {
//!     failure_threshold: 5,
//!     failure_window: Duration::from_secs(120),
//!     cooldown: Duration::from_secs(30),
//! };
//! let breaker = RepeatedFailureCircuitBreaker::new(
//!     "event_dispatch".to_string(),
//!     settings,
//!     Arc::new(LogCriticalErrorSink),
//! );
//!
//! let result = breaker
//!     .call(|| async {
//!         // one loop iteration here
//!         Ok::<&str, String>("done")
//!     })
//!     .await;
//! assert!(result.is_ok());
//! # }
//! ```

pub mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreakerError, CircuitBreakerSettings, CircuitState, RepeatedFailureCircuitBreaker,
};
