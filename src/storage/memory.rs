//! # In-Memory Store
//!
//! Reference implementation of [`RecoverabilityStore`] over process memory.
//! Backs the test suites and embedded scenarios; mirrors the semantics the
//! core relies on from a real document store: atomic batch writes, a
//! monotonic change sequence with prefix-filtered notifications, and an
//! index watermark that can be made to lag writes for staleness testing.

use crate::constants::prefixes;
use crate::error::Result;
use crate::models::{
    FailureGroupView, FailureRecord, PendingDispatchRequest, RegroupingBatch, RegroupingSweepState,
};
use crate::storage::{DocumentChange, QueryStats, RecoverabilityStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Dispatch requests remember the change sequence that created them so the
/// pending query can honor the index watermark the way an index-backed
/// store would.
struct SequencedDispatchRequest {
    request: PendingDispatchRequest,
    sequence: u64,
}

#[derive(Default)]
struct Tables {
    failures: BTreeMap<String, FailureRecord>,
    dispatch_requests: BTreeMap<String, SequencedDispatchRequest>,
    sweep_states: BTreeMap<String, RegroupingSweepState>,
    regrouping_batches: BTreeMap<String, RegroupingBatch>,
}

/// In-memory document store with change-feed and watermark semantics
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    subscribers: RwLock<Vec<(String, broadcast::Sender<DocumentChange>)>>,
    sequence: AtomicU64,
    /// Artificial distance the index trails behind writes; tests use this
    /// to exercise the under-reported-work path.
    index_lag: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            subscribers: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            index_lag: AtomicU64::new(0),
        }
    }

    /// Make the index watermark trail the change sequence by `lag`.
    pub fn set_index_lag(&self, lag: u64) {
        self.index_lag.store(lag, Ordering::Release);
    }

    pub fn change_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn notify_change(&self, document_id: &str, sequence: u64) {
        let change = DocumentChange {
            id: document_id.to_string(),
            sequence,
        };
        let subscribers = self.subscribers.read();
        for (prefix, sender) in subscribers.iter() {
            if document_id.starts_with(prefix.as_str()) {
                // a lagging or dropped receiver must not fail the write
                let _ = sender.send(change.clone());
            }
        }
    }

    fn record_change(&self, document_id: &str) {
        let sequence = self.next_sequence();
        self.notify_change(document_id, sequence);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecoverabilityStore for InMemoryStore {
    async fn load_failures(&self, ids: &[String]) -> Result<Vec<FailureRecord>> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.failures.get(id).cloned())
            .collect())
    }

    async fn store_failures(&self, failures: &[FailureRecord]) -> Result<()> {
        {
            let mut tables = self.tables.write();
            for failure in failures {
                tables.failures.insert(failure.id.clone(), failure.clone());
            }
        }
        for failure in failures {
            self.record_change(&format!("{}{}", prefixes::FAILURE_RECORDS, failure.id));
        }
        Ok(())
    }

    async fn stale_fingerprint_failure_ids(
        &self,
        current_fingerprint: &str,
        limit: usize,
    ) -> Result<(Vec<String>, QueryStats)> {
        let tables = self.tables.read();
        let matching: Vec<&FailureRecord> = tables
            .failures
            .values()
            .filter(|f| f.classifier_fingerprint.as_deref() != Some(current_fingerprint))
            .collect();
        let stats = QueryStats {
            total_results: matching.len() as u64,
            index_watermark: self.index_watermark_now(),
        };
        let ids = matching
            .into_iter()
            .take(limit)
            .map(|f| f.id.clone())
            .collect();
        Ok((ids, stats))
    }

    async fn failures_with_no_groups(
        &self,
        limit: usize,
    ) -> Result<(Vec<FailureRecord>, QueryStats)> {
        let tables = self.tables.read();
        let matching: Vec<&FailureRecord> = tables
            .failures
            .values()
            .filter(|f| f.failure_groups.is_empty())
            .collect();
        let stats = QueryStats {
            total_results: matching.len() as u64,
            index_watermark: self.index_watermark_now(),
        };
        let page = matching.into_iter().take(limit).cloned().collect();
        Ok((page, stats))
    }

    async fn failures_missing_classifiers(
        &self,
        classifier_names: &[String],
        limit: usize,
    ) -> Result<(Vec<FailureRecord>, QueryStats)> {
        let tables = self.tables.read();
        let matching: Vec<&FailureRecord> = tables
            .failures
            .values()
            .filter(|f| {
                !f.failure_groups.is_empty()
                    && classifier_names
                        .iter()
                        .any(|name| !f.was_classified_by(name))
            })
            .collect();
        let stats = QueryStats {
            total_results: matching.len() as u64,
            index_watermark: self.index_watermark_now(),
        };
        let page = matching.into_iter().take(limit).cloned().collect();
        Ok((page, stats))
    }

    async fn failure_group_views(&self) -> Result<Vec<FailureGroupView>> {
        let tables = self.tables.read();
        let mut views: HashMap<uuid::Uuid, FailureGroupView> = HashMap::new();
        for failure in tables.failures.values() {
            for group in &failure.failure_groups {
                views
                    .entry(group.id)
                    .and_modify(|view| {
                        view.count += 1;
                        view.first = view.first.min(group.first);
                        view.last = view.last.max(group.last);
                    })
                    .or_insert_with(|| FailureGroupView {
                        id: group.id,
                        title: group.title.clone(),
                        classifier_name: group.classifier_name.clone(),
                        count: 1,
                        first: group.first,
                        last: group.last,
                    });
            }
        }
        let mut views: Vec<FailureGroupView> = views.into_values().collect();
        views.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));
        Ok(views)
    }

    async fn load_sweep_state(&self, fingerprint: &str) -> Result<Option<RegroupingSweepState>> {
        let key = format!("{}{}", prefixes::REGROUPING_SWEEP_STATE, fingerprint);
        Ok(self.tables.read().sweep_states.get(&key).cloned())
    }

    async fn store_sweep_state(&self, state: &RegroupingSweepState) -> Result<()> {
        self.tables
            .write()
            .sweep_states
            .insert(state.id.clone(), state.clone());
        self.record_change(&state.id);
        Ok(())
    }

    async fn load_regrouping_batch(&self, fingerprint: &str) -> Result<Option<RegroupingBatch>> {
        let key = format!("{}{}", prefixes::REGROUPING_BATCHES, fingerprint);
        Ok(self.tables.read().regrouping_batches.get(&key).cloned())
    }

    async fn store_regrouping_batch(&self, batch: &RegroupingBatch) -> Result<()> {
        self.tables
            .write()
            .regrouping_batches
            .insert(batch.id.clone(), batch.clone());
        self.record_change(&batch.id);
        Ok(())
    }

    async fn delete_regrouping_batch(&self, fingerprint: &str) -> Result<()> {
        let key = format!("{}{}", prefixes::REGROUPING_BATCHES, fingerprint);
        self.tables.write().regrouping_batches.remove(&key);
        Ok(())
    }

    async fn store_dispatch_request(&self, request: &PendingDispatchRequest) -> Result<()> {
        let sequence = self.next_sequence();
        self.tables.write().dispatch_requests.insert(
            request.id.clone(),
            SequencedDispatchRequest {
                request: request.clone(),
                sequence,
            },
        );
        self.notify_change(&request.id, sequence);
        Ok(())
    }

    async fn pending_dispatch_requests(
        &self,
        limit: usize,
    ) -> Result<Vec<PendingDispatchRequest>> {
        // only requests the index has caught up with are visible, matching
        // the under-reporting behavior of an index-backed store
        let visible_up_to = self.index_watermark_now();
        let tables = self.tables.read();
        let mut requests: Vec<&SequencedDispatchRequest> = tables
            .dispatch_requests
            .values()
            .filter(|stored| stored.sequence <= visible_up_to)
            .collect();
        requests.sort_by_key(|stored| stored.sequence);
        requests.truncate(limit);
        Ok(requests.into_iter().map(|s| s.request.clone()).collect())
    }

    async fn delete_dispatch_requests(&self, ids: &[String]) -> Result<()> {
        let mut tables = self.tables.write();
        for id in ids {
            tables.dispatch_requests.remove(id);
        }
        Ok(())
    }

    fn subscribe_changes(&self, prefix: &str) -> broadcast::Receiver<DocumentChange> {
        let (sender, receiver) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        self.subscribers
            .write()
            .push((prefix.to_string(), sender));
        receiver
    }

    async fn index_watermark(&self) -> Result<u64> {
        Ok(self.index_watermark_now())
    }
}

impl InMemoryStore {
    fn index_watermark_now(&self) -> u64 {
        self.sequence
            .load(Ordering::Acquire)
            .saturating_sub(self.index_lag.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispatchContext;
    use crate::test_helpers::failure_record;

    #[tokio::test]
    async fn change_feed_is_prefix_filtered_with_monotonic_sequences() {
        let store = InMemoryStore::new();
        let mut dispatch_changes =
            store.subscribe_changes(prefixes::PENDING_DISPATCH_REQUESTS);
        let mut failure_changes = store.subscribe_changes(prefixes::FAILURE_RECORDS);

        let request = PendingDispatchRequest::new(DispatchContext {
            event_type: "MessageFailed".to_string(),
            payload: serde_json::json!({}),
        });
        store.store_dispatch_request(&request).await.unwrap();
        store
            .store_failures(&[failure_record("msg-1", "Boom")])
            .await
            .unwrap();

        let first = dispatch_changes.recv().await.unwrap();
        assert_eq!(first.id, request.id);
        let second = failure_changes.recv().await.unwrap();
        assert!(second.id.starts_with(prefixes::FAILURE_RECORDS));
        assert!(second.sequence > first.sequence);
        assert!(dispatch_changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn index_lag_makes_watermark_trail_changes() {
        let store = InMemoryStore::new();
        store
            .store_failures(&[failure_record("msg-1", "Boom")])
            .await
            .unwrap();
        assert_eq!(store.index_watermark().await.unwrap(), store.change_sequence());

        store.set_index_lag(1);
        assert_eq!(
            store.index_watermark().await.unwrap(),
            store.change_sequence() - 1
        );
    }

    #[tokio::test]
    async fn stale_fingerprint_query_reports_total_beyond_page() {
        let store = InMemoryStore::new();
        let records: Vec<_> = (0..3)
            .map(|i| failure_record(&format!("msg-{i}"), "Boom"))
            .collect();
        store.store_failures(&records).await.unwrap();

        let (ids, stats) = store
            .stale_fingerprint_failure_ids("fp-current", 1)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(stats.total_results, 3);
    }

    #[tokio::test]
    async fn pending_dispatch_requests_honor_limit_and_deletion() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            let request = PendingDispatchRequest::new(DispatchContext {
                event_type: format!("Event{i}"),
                payload: serde_json::json!({}),
            });
            store.store_dispatch_request(&request).await.unwrap();
        }

        let page = store.pending_dispatch_requests(2).await.unwrap();
        assert_eq!(page.len(), 2);

        let all = store.pending_dispatch_requests(10).await.unwrap();
        let ids: Vec<String> = all.iter().map(|r| r.id.clone()).collect();
        store.delete_dispatch_requests(&ids).await.unwrap();
        assert!(store.pending_dispatch_requests(10).await.unwrap().is_empty());
    }
}
