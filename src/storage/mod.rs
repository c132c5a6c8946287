//! # Storage Contracts
//!
//! The durable store is an external collaborator; this module defines only
//! the contract the recoverability core consumes:
//!
//! - statistics-bearing queries (the totals drive the regrouping sweep's
//!   re-enqueue decision),
//! - atomic multi-document stores (a regrouping pass persists group
//!   memberships and progress all-or-nothing),
//! - prefix-filtered change notifications with monotonic sequences,
//! - an index-staleness watermark comparable against the last observed
//!   change sequence.
//!
//! [`InMemoryStore`] implements the whole contract and backs the test
//! suites and embedded scenarios.

pub mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::models::{
    FailureGroupView, FailureRecord, PendingDispatchRequest, RegroupingBatch, RegroupingSweepState,
};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Statistics returned alongside query results. `total_results` is the
/// total matching the query, not the page size; `index_watermark` is the
/// store's index position when the query ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_results: u64,
    pub index_watermark: u64,
}

/// One change-feed notification: a document was created or updated at the
/// given monotonic sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub id: String,
    pub sequence: u64,
}

/// Durable-store contract consumed by the recoverability core
#[async_trait]
pub trait RecoverabilityStore: Send + Sync {
    /// Load failure records by message id; unknown ids are skipped.
    async fn load_failures(&self, ids: &[String]) -> Result<Vec<FailureRecord>>;

    /// Persist a batch of failure records atomically (all-or-nothing).
    async fn store_failures(&self, failures: &[FailureRecord]) -> Result<()>;

    /// Ids of failures whose stored classifier fingerprint differs from
    /// `current_fingerprint` (a missing fingerprint counts as different),
    /// up to `limit`, with the total matching count.
    async fn stale_fingerprint_failure_ids(
        &self,
        current_fingerprint: &str,
        limit: usize,
    ) -> Result<(Vec<String>, QueryStats)>;

    /// Failures carrying no group memberships at all, up to `limit`.
    async fn failures_with_no_groups(
        &self,
        limit: usize,
    ) -> Result<(Vec<FailureRecord>, QueryStats)>;

    /// Already-grouped failures whose last classification did not include
    /// at least one of the given classifiers, up to `limit`. Group-less
    /// failures are excluded; they surface through
    /// [`Self::failures_with_no_groups`] instead.
    async fn failures_missing_classifiers(
        &self,
        classifier_names: &[String],
        limit: usize,
    ) -> Result<(Vec<FailureRecord>, QueryStats)>;

    /// Aggregated grouping view for read APIs: one row per failure group
    /// with its member count and occurrence window, sorted by descending
    /// count.
    async fn failure_group_views(&self) -> Result<Vec<FailureGroupView>>;

    async fn load_sweep_state(&self, fingerprint: &str) -> Result<Option<RegroupingSweepState>>;

    async fn store_sweep_state(&self, state: &RegroupingSweepState) -> Result<()>;

    async fn load_regrouping_batch(&self, fingerprint: &str) -> Result<Option<RegroupingBatch>>;

    async fn store_regrouping_batch(&self, batch: &RegroupingBatch) -> Result<()>;

    async fn delete_regrouping_batch(&self, fingerprint: &str) -> Result<()>;

    async fn store_dispatch_request(&self, request: &PendingDispatchRequest) -> Result<()>;

    /// Pending dispatch requests in stable order, up to `limit`.
    async fn pending_dispatch_requests(&self, limit: usize)
        -> Result<Vec<PendingDispatchRequest>>;

    /// Delete consumed dispatch requests in one call.
    async fn delete_dispatch_requests(&self, ids: &[String]) -> Result<()>;

    /// Subscribe to change notifications for documents whose id starts with
    /// `prefix`. Notifications fire on create and update.
    fn subscribe_changes(&self, prefix: &str) -> broadcast::Receiver<DocumentChange>;

    /// The store's current index position. When this trails the last
    /// observed change sequence, queries may under-report and callers
    /// should retry rather than block.
    async fn index_watermark(&self) -> Result<u64>;
}
