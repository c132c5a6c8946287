//! # System Constants
//!
//! Core constants that define the operational boundaries of the
//! recoverability subsystem: document-key prefixes for the durable store,
//! internal event names, and tuning defaults shared between configuration
//! and components.

/// Document-key prefixes for records owned by this crate in the durable store
pub mod prefixes {
    /// Dispatch requests awaiting external publication
    pub const PENDING_DISPATCH_REQUESTS: &str = "PendingDispatchRequests/";

    /// Sweep-state markers, keyed by classifier-set fingerprint
    pub const REGROUPING_SWEEP_STATE: &str = "RegroupingSweepState/";

    /// Chunked regrouping batches, keyed by classifier-set fingerprint
    pub const REGROUPING_BATCHES: &str = "RegroupingBatches/";

    /// Failure records, keyed by unique message id
    pub const FAILURE_RECORDS: &str = "FailureRecords/";
}

/// Internal domain event names raised on the event bus
pub mod events {
    /// A derived integration event could not be published externally
    pub const EXTERNAL_EVENT_PUBLISH_FAILED: &str = "recoverability.external_event_publish_failed";

    /// A regrouping pass finished one batch of failures
    pub const REGROUPING_BATCH_COMPLETED: &str = "recoverability.regrouping_batch_completed";

    /// A full regrouping sweep ran to exhaustion
    pub const REGROUPING_COMPLETED: &str = "recoverability.regrouping_completed";
}

/// Tuning defaults, overridable through [`crate::config::RecoverabilityConfig`]
pub mod defaults {
    use std::time::Duration;

    /// Maximum dispatch requests pulled per dispatch pass
    pub const DISPATCH_BATCH_SIZE: usize = 100;

    /// Fixed delay inserted after a non-empty dispatch pass
    pub const DISPATCH_BATCH_DELAY: Duration = Duration::from_millis(200);

    /// Fallback wake-up interval when blocked on the change feed
    pub const DISPATCH_WAKE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Consecutive iteration failures that open the dispatch circuit
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;

    /// Rolling window the consecutive failures must fall within
    pub const CIRCUIT_FAILURE_WINDOW: Duration = Duration::from_secs(120);

    /// Cooldown before an open circuit admits a half-open trial
    pub const CIRCUIT_COOLDOWN: Duration = Duration::from_secs(30);

    /// Maximum failures re-classified per regrouping pass
    pub const REGROUPING_BATCH_SIZE: usize = 500;

    /// Discovery chunk size for the regrouping check phase. Deliberately
    /// tiny: discovery only needs to prove stale failures exist before the
    /// processing phase takes over with its own batching.
    pub const REGROUPING_DISCOVERY_CHUNK_SIZE: usize = 1;
}
