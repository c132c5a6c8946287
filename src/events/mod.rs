//! # Internal Domain Events
//!
//! Broadcast-channel event bus for notifications raised inside the service:
//! failed external publishes, regrouping progress. Out-of-scope read APIs
//! and auditing subscribe here; publishing with no subscribers is fine.

pub mod publisher;

pub use publisher::{DomainEvent, DomainEventBus, PublishError};
