//! # Dispatch Request Model
//!
//! A `PendingDispatchRequest` is the durable hand-off between upstream
//! feature handlers that raise business events and the
//! [`crate::dispatch::EventDispatchLoop`] that publishes them to external
//! integrations. Handlers store requests; the dispatch loop is the exclusive
//! consumer and deletes them once the batch has been published.

use crate::constants::prefixes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The business-event context carried by one dispatch request. Payload shape
/// is owned by the publisher that derives integration events from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchContext {
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// One queued external publication, stored under the
/// `PendingDispatchRequests/` key prefix so the dispatch loop's change-feed
/// subscription sees it the moment it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDispatchRequest {
    pub id: String,
    pub dispatch_context: DispatchContext,
    pub created_at: DateTime<Utc>,
}

impl PendingDispatchRequest {
    pub fn new(dispatch_context: DispatchContext) -> Self {
        Self {
            id: format!("{}{}", prefixes::PENDING_DISPATCH_REQUESTS, Uuid::new_v4()),
            dispatch_context,
            created_at: Utc::now(),
        }
    }
}
