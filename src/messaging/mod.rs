//! # Messaging Runtime Contract
//!
//! The messaging runtime is an external collaborator. The core uses it two
//! ways: send-local to re-inject internal workflow continuation messages
//! (the regrouping sweep enqueues its own next pass), and publish to emit
//! externally visible integration events from the dispatch loop.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Internal control messages the core sends to itself through the runtime's
/// local queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Continue the legacy regrouping sweep for one classifier-set
    /// fingerprint
    ContinueLegacyRegrouping { fingerprint: String },
}

/// An externally visible integration event derived by a publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl OutboundEvent {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Send/publish surface of the messaging runtime
#[async_trait]
pub trait MessageSession: Send + Sync {
    /// Enqueue a control message to this service's own input queue.
    async fn send_local(&self, message: ControlMessage) -> Result<()>;

    /// Publish an integration event for external consumers.
    async fn publish(&self, event: OutboundEvent) -> Result<()>;
}
