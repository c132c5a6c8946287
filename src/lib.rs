#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Recoverability Core
//!
//! High-performance Rust core of the operational control plane for a
//! message-driven architecture: tracks failed message processing attempts,
//! orchestrates bulk retry of failed messages, classifies and groups
//! failures for operator triage, and reliably republishes internal domain
//! events to external integrations.
//!
//! ## Architecture
//!
//! Three subsystems share the hardest engineering properties in the
//! service: concurrent shared state, batched resumable background work,
//! idempotent re-classification, and failure isolation under a circuit
//! breaker.
//!
//! - [`retries`] - the retry-operation lifecycle tracker and the
//!   [`retries::RetryOrchestrator`] registry routing lifecycle events from
//!   concurrent message handlers.
//! - [`classification`] + [`regrouping`] - the failure grouping engine with
//!   deterministic group identities, and the resumable background sweep
//!   that re-groups failures classified under a stale classifier set.
//! - [`dispatch`] + [`resilience`] - the change-feed-driven external event
//!   dispatch loop, wrapped iteration-by-iteration in a repeated-failure
//!   circuit breaker.
//!
//! The durable store and the messaging runtime are external collaborators;
//! [`storage`] and [`messaging`] define only the contracts the core
//! consumes, and [`storage::InMemoryStore`] implements the store contract
//! for tests and embedded use.
//!
//! ## Module Organization
//!
//! - [`models`] - failure records, dispatch requests, regrouping documents
//! - [`classification`] - classifiers, grouping engine, fingerprinting
//! - [`regrouping`] - the two-phase legacy regrouping sweep
//! - [`retries`] - retry operation state machine and orchestrator
//! - [`dispatch`] - event dispatch loop and publisher seam
//! - [`resilience`] - circuit breaker
//! - [`events`] - internal domain event bus
//! - [`storage`] / [`messaging`] / [`alerting`] - collaborator contracts
//! - [`config`] - typed configuration with environment overrides
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recoverability_core::classification::{default_classifiers, FailureGroupingEngine};
//! use recoverability_core::retries::{RetryOrchestrator, RetryType};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(FailureGroupingEngine::new(default_classifiers()));
//! let orchestrator = Arc::new(RetryOrchestrator::new());
//!
//! orchestrator.wait(
//!     Some("retry-request-1"),
//!     RetryType::FailureGroup,
//!     chrono::Utc::now(),
//!     Some("triage UI".to_string()),
//!     None,
//!     None,
//! );
//! assert!(orchestrator.is_retry_in_progress_for(Some("retry-request-1")));
//! ```
//!
//! ## Concurrency Model
//!
//! The dispatch loop runs on one dedicated background task; the retry
//! orchestrator and grouping engine are invoked synchronously from message
//! handlers the runtime executes concurrently across a worker pool. Each
//! service instance owns one in-memory orchestrator - there is no
//! cross-instance coordination, by design.

pub mod alerting;
pub mod bootstrap;
pub mod classification;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod regrouping;
pub mod resilience;
pub mod retries;
pub mod storage;
pub mod test_helpers;

pub use config::RecoverabilityConfig;
pub use error::{RecoverabilityError, Result};

pub use alerting::{CriticalErrorSink, LogCriticalErrorSink};
pub use bootstrap::RecoverabilityCore;
pub use classification::{default_classifiers, FailureGroupingEngine};
pub use dispatch::{EventDispatchLoop, IntegrationEventPublisher};
pub use events::DomainEventBus;
pub use messaging::{ControlMessage, MessageSession, OutboundEvent};
pub use models::{
    DispatchContext, FailureGroup, FailureGroupView, FailureRecord, FailureStatus,
    PendingDispatchRequest,
};
pub use regrouping::{LegacyRegroupingSweep, RegroupingProcessor};
pub use resilience::{CircuitBreakerSettings, CircuitState, RepeatedFailureCircuitBreaker};
pub use retries::{RetryOperationSummary, RetryOrchestrator, RetryPhase, RetryType};
pub use storage::{InMemoryStore, RecoverabilityStore};
