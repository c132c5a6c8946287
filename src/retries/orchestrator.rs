//! # Retry Orchestrator
//!
//! Shared registry of in-flight retry operations. Message handlers invoked
//! concurrently across the messaging runtime's worker pool all route their
//! lifecycle events through one orchestrator instance, so the registry is a
//! concurrent map: get-or-create per key is atomic, mutation of one
//! operation happens under that key's exclusive guard, and operations with
//! different keys proceed independently.
//!
//! ## Legacy batches
//!
//! Batches created before operation tracking existed carry no request id.
//! Every mutating call with `request_id = None` is a silent no-op, and no
//! query ever reports such a batch as in progress.
//!
//! ## Durability
//!
//! Operation state is process-local and lost on restart. There is no
//! cross-instance coordination: each running service owns exactly one
//! orchestrator, and the single-writer assumption is part of the design.

use crate::retries::{RetryOperation, RetryOperationSummary, RetryType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OperationKey {
    request_id: String,
    retry_type: RetryType,
}

/// Registry of retry operations keyed by `(request id, retry type)`.
/// Explicitly constructed and dependency-injected; never a process-wide
/// static.
#[derive(Debug, Default)]
pub struct RetryOrchestrator {
    operations: DashMap<OperationKey, RetryOperation>,
}

impl RetryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one lifecycle event to the operation for `(request_id,
    /// retry_type)`, creating it on first contact. `None` request ids are
    /// legacy batches and are ignored.
    fn with_operation(
        &self,
        request_id: Option<&str>,
        retry_type: RetryType,
        apply: impl FnOnce(&mut RetryOperation),
    ) {
        let Some(request_id) = request_id else {
            return;
        };
        let key = OperationKey {
            request_id: request_id.to_string(),
            retry_type,
        };
        let mut entry = self
            .operations
            .entry(key)
            .or_insert_with(|| RetryOperation::new(request_id, retry_type));
        apply(entry.value_mut());
    }

    pub fn wait(
        &self,
        request_id: Option<&str>,
        retry_type: RetryType,
        started: DateTime<Utc>,
        originator: Option<String>,
        classifier: Option<String>,
        last: Option<DateTime<Utc>>,
    ) {
        self.with_operation(request_id, retry_type, |op| {
            op.wait(started, originator, classifier, last);
        });
    }

    pub fn preparing(&self, request_id: Option<&str>, retry_type: RetryType, total: usize) {
        self.with_operation(request_id, retry_type, |op| op.preparing(total));
    }

    pub fn prepared_batch(&self, request_id: Option<&str>, retry_type: RetryType, count: usize) {
        self.with_operation(request_id, retry_type, |op| op.prepared_batch(count));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn prepared_adopted_batch(
        &self,
        request_id: Option<&str>,
        retry_type: RetryType,
        prepared: usize,
        total: usize,
        originator: Option<String>,
        classifier: Option<String>,
        started: DateTime<Utc>,
        last: Option<DateTime<Utc>>,
    ) {
        self.with_operation(request_id, retry_type, |op| {
            op.prepared_adopted_batch(prepared, total, originator, classifier, started, last);
        });
    }

    pub fn forwarding(&self, request_id: Option<&str>, retry_type: RetryType) {
        self.with_operation(request_id, retry_type, RetryOperation::forwarding);
    }

    pub fn forwarded_batch(&self, request_id: Option<&str>, retry_type: RetryType, count: usize) {
        self.with_operation(request_id, retry_type, |op| op.forwarded_batch(count));
    }

    /// Mark the operation failed. Never errors; only flips state.
    pub fn fail(&self, request_id: Option<&str>, retry_type: RetryType) {
        self.with_operation(request_id, retry_type, |op| {
            op.fail();
            info!(request_id = %op.request_id, retry_type = %op.retry_type, "🔴 Retry operation failed");
        });
    }

    pub fn skip(&self, request_id: Option<&str>, retry_type: RetryType, count: usize) {
        self.with_operation(request_id, retry_type, |op| op.skip(count));
    }

    /// Whether the specific `(request id, retry type)` operation is between
    /// `wait` and completion/failure.
    pub fn is_operation_in_progress_for(
        &self,
        request_id: Option<&str>,
        retry_type: RetryType,
    ) -> bool {
        let Some(request_id) = request_id else {
            return false;
        };
        let key = OperationKey {
            request_id: request_id.to_string(),
            retry_type,
        };
        self.operations
            .get(&key)
            .is_some_and(|op| op.is_in_progress())
    }

    /// Whether any retry operation for `request_id` is in progress,
    /// regardless of retry type.
    pub fn is_retry_in_progress_for(&self, request_id: Option<&str>) -> bool {
        let Some(request_id) = request_id else {
            return false;
        };
        self.operations
            .iter()
            .any(|entry| entry.key().request_id == request_id && entry.value().is_in_progress())
    }

    /// Progress snapshot for one operation, if it has ever been seen.
    pub fn get_status_for_retry_operation(
        &self,
        request_id: Option<&str>,
        retry_type: RetryType,
    ) -> Option<RetryOperationSummary> {
        let request_id = request_id?;
        let key = OperationKey {
            request_id: request_id.to_string(),
            retry_type,
        };
        self.operations.get(&key).map(|op| op.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retries::RetryPhase;
    use std::sync::Arc;

    #[test]
    fn null_request_id_is_a_silent_noop() {
        let orchestrator = RetryOrchestrator::new();
        orchestrator.wait(None, RetryType::FailureGroup, Utc::now(), None, None, None);
        orchestrator.preparing(None, RetryType::FailureGroup, 10);
        orchestrator.prepared_batch(None, RetryType::FailureGroup, 10);
        orchestrator.fail(None, RetryType::FailureGroup);

        assert!(!orchestrator.is_operation_in_progress_for(None, RetryType::FailureGroup));
        assert!(!orchestrator.is_retry_in_progress_for(None));
        assert!(orchestrator
            .get_status_for_retry_operation(None, RetryType::FailureGroup)
            .is_none());
        assert!(orchestrator.operations.is_empty());
    }

    #[test]
    fn lifecycle_accumulation_reports_prepared_status() {
        let orchestrator = RetryOrchestrator::new();
        let id = Some("req-1");
        orchestrator.wait(id, RetryType::FailureGroup, Utc::now(), None, None, None);
        orchestrator.preparing(id, RetryType::FailureGroup, 10);
        orchestrator.prepared_batch(id, RetryType::FailureGroup, 6);
        orchestrator.prepared_batch(id, RetryType::FailureGroup, 4);

        let status = orchestrator
            .get_status_for_retry_operation(id, RetryType::FailureGroup)
            .unwrap();
        assert_eq!(status.prepared, 10);
        assert_eq!(status.phase, RetryPhase::Prepared);
    }

    #[test]
    fn operations_are_keyed_by_request_id_and_retry_type() {
        let orchestrator = RetryOrchestrator::new();
        orchestrator.wait(
            Some("req-1"),
            RetryType::FailureGroup,
            Utc::now(),
            None,
            None,
            None,
        );

        assert!(orchestrator.is_operation_in_progress_for(Some("req-1"), RetryType::FailureGroup));
        assert!(!orchestrator.is_operation_in_progress_for(Some("req-1"), RetryType::All));
        assert!(orchestrator.is_retry_in_progress_for(Some("req-1")));
        assert!(!orchestrator.is_retry_in_progress_for(Some("req-2")));
    }

    #[test]
    fn completed_operations_are_not_in_progress() {
        let orchestrator = RetryOrchestrator::new();
        let id = Some("req-1");
        orchestrator.wait(id, RetryType::SingleMessage, Utc::now(), None, None, None);
        orchestrator.preparing(id, RetryType::SingleMessage, 1);
        orchestrator.prepared_batch(id, RetryType::SingleMessage, 1);
        orchestrator.forwarding(id, RetryType::SingleMessage);
        orchestrator.forwarded_batch(id, RetryType::SingleMessage, 1);

        assert!(!orchestrator.is_retry_in_progress_for(id));
        let status = orchestrator
            .get_status_for_retry_operation(id, RetryType::SingleMessage)
            .unwrap();
        assert_eq!(status.phase, RetryPhase::Completed);
    }

    #[test]
    fn concurrent_updates_to_distinct_operations_do_not_interfere() {
        let orchestrator = Arc::new(RetryOrchestrator::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                std::thread::spawn(move || {
                    let request_id = format!("req-{i}");
                    let id = Some(request_id.as_str());
                    orchestrator.wait(id, RetryType::FailureGroup, Utc::now(), None, None, None);
                    orchestrator.preparing(id, RetryType::FailureGroup, 100);
                    for _ in 0..100 {
                        orchestrator.prepared_batch(id, RetryType::FailureGroup, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            let request_id = format!("req-{i}");
            let status = orchestrator
                .get_status_for_retry_operation(Some(&request_id), RetryType::FailureGroup)
                .unwrap();
            assert_eq!(status.prepared, 100);
            assert_eq!(status.phase, RetryPhase::Prepared);
        }
    }
}
