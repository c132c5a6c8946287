//! # Failure Record Model
//!
//! A `FailureRecord` is the unit of triage: one failed message, its ordered
//! history of processing attempts, and the failure-group memberships the
//! classification engine has assigned to it.
//!
//! ## Invariants
//!
//! - A record always has at least one processing attempt. The constructor
//!   takes the first attempt, and attempts are only ever appended.
//! - Group memberships are valid only for the classifier-set fingerprint
//!   recorded alongside them; when the registered classifier set changes,
//!   memberships must be recomputed (see [`crate::regrouping`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle status of a failed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    /// Awaiting operator action or retry
    Unresolved,
    /// Successfully retried or manually marked resolved
    Resolved,
    /// Hidden from triage without resolution
    Archived,
}

/// Details captured from the exception that failed a processing attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub exception_type: String,
    pub message: String,
    pub stack_trace: String,
    pub time_of_failure: DateTime<Utc>,
}

/// One processing attempt of a failed message, with the metadata snapshot
/// taken at the time of the failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingAttempt {
    pub attempted_at: DateTime<Utc>,
    pub failure: FailureDetails,
    /// Fully-qualified message type, when the transport could determine it
    pub message_type: Option<String>,
    pub endpoint_name: Option<String>,
    pub endpoint_instance: Option<String>,
    /// Transport address of the endpoint the message failed at
    pub failing_endpoint_address: Option<String>,
    /// Free-form headers/metadata snapshot
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Membership in one failure group, as assigned by a single classifier.
///
/// The id is a deterministic UUIDv5 over (classifier name, title), so
/// re-classifying identical input always yields the identical group id
/// across restarts and processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureGroup {
    pub id: Uuid,
    pub title: String,
    /// Name of the classifier that produced this group
    pub classifier_name: String,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Aggregated grouping view served to read APIs: one row per group with the
/// derived member count and occurrence window. Never authored directly;
/// always computed from stored failure records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureGroupView {
    pub id: Uuid,
    pub title: String,
    pub classifier_name: String,
    pub count: u64,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// A failed message under recoverability management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Unique message id; doubles as the document key suffix
    pub id: String,
    pub status: FailureStatus,
    /// Ordered processing attempts, oldest first; never empty
    processing_attempts: Vec<ProcessingAttempt>,
    pub failure_groups: Vec<FailureGroup>,
    /// Classifier-set fingerprint that produced the current memberships
    pub classifier_fingerprint: Option<String>,
    /// Classifiers that ran when memberships were last computed. A
    /// classifier that declined leaves no group, so group absence alone
    /// cannot distinguish "not applicable" from "never ran".
    #[serde(default)]
    pub applied_classifiers: Vec<String>,
}

impl FailureRecord {
    /// Create a record from its first processing attempt, establishing the
    /// at-least-one-attempt invariant.
    pub fn new(id: impl Into<String>, first_attempt: ProcessingAttempt) -> Self {
        Self {
            id: id.into(),
            status: FailureStatus::Unresolved,
            processing_attempts: vec![first_attempt],
            failure_groups: Vec::new(),
            classifier_fingerprint: None,
            applied_classifiers: Vec::new(),
        }
    }

    pub fn record_attempt(&mut self, attempt: ProcessingAttempt) {
        self.processing_attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[ProcessingAttempt] {
        &self.processing_attempts
    }

    /// Most recent processing attempt. Total by the constructor invariant.
    pub fn latest_attempt(&self) -> &ProcessingAttempt {
        self.processing_attempts
            .last()
            .expect("failure record always has at least one processing attempt")
    }

    /// Classification input derived from the latest processing attempt
    pub fn classifiable(&self) -> ClassifiableFailure<'_> {
        let attempt = self.latest_attempt();
        ClassifiableFailure {
            message_type: attempt.message_type.as_deref(),
            details: &attempt.failure,
            endpoint_name: attempt.endpoint_name.as_deref(),
            endpoint_instance: attempt.endpoint_instance.as_deref(),
            failing_endpoint_address: attempt.failing_endpoint_address.as_deref(),
        }
    }

    /// Replace group memberships with a freshly classified set, stamping
    /// the fingerprint and classifier list they were computed under.
    pub fn regroup(
        &mut self,
        groups: Vec<FailureGroup>,
        fingerprint: &str,
        applied_classifiers: Vec<String>,
    ) {
        self.failure_groups = groups;
        self.classifier_fingerprint = Some(fingerprint.to_string());
        self.applied_classifiers = applied_classifiers;
    }

    /// Whether `classifier_name` ran the last time this record was
    /// classified.
    pub fn was_classified_by(&self, classifier_name: &str) -> bool {
        self.applied_classifiers
            .iter()
            .any(|name| name == classifier_name)
    }

    /// Whether this record carries a membership produced by `classifier_name`
    pub fn has_group_from(&self, classifier_name: &str) -> bool {
        self.failure_groups
            .iter()
            .any(|g| g.classifier_name == classifier_name)
    }
}

/// Borrowed view over one failure handed to classifiers: the message type
/// and failure details of the attempt under classification.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiableFailure<'a> {
    pub message_type: Option<&'a str>,
    pub details: &'a FailureDetails,
    pub endpoint_name: Option<&'a str>,
    pub endpoint_instance: Option<&'a str>,
    pub failing_endpoint_address: Option<&'a str>,
}
