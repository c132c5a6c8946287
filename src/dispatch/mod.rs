//! # External Event Dispatch
//!
//! Change-feed-driven publication of queued business events to external
//! integrations.
//!
//! ## Architecture
//!
//! - [`IntegrationEventPublisher`]: pluggable derivation of integration
//!   events from a batch of dispatch contexts (not necessarily 1:1).
//! - [`EventDispatchLoop`]: one dedicated background task that pulls
//!   bounded batches of [`crate::models::PendingDispatchRequest`]s, runs
//!   every publisher over them, publishes the derived events on the
//!   messaging runtime, and deletes the consumed requests. Wake-ups are
//!   event-driven through the store's change feed with a polling fallback
//!   for staleness safety.
//!
//! A publish failure for one event never aborts the batch: it is converted
//! into an `external_event_publish_failed` domain event and the loop moves
//! on. Iteration-level failures feed the circuit breaker, which suspends
//! the loop and raises a critical alert when failures repeat.

pub mod dispatch_loop;
pub mod publisher;

pub use dispatch_loop::{EventDispatchLoop, PassOutcome};
pub use publisher::IntegrationEventPublisher;
