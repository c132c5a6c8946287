//! # Failure Grouping Engine
//!
//! Runs every registered classifier over one failure and produces the
//! failure-group memberships that drive operator triage. Group identity is
//! content-addressed: identical (classifier, title) pairs always map to the
//! identical group id, which is what makes re-classification idempotent.

use crate::classification::{classifier_set_fingerprint, FailureClassifier};
use crate::models::{ClassifiableFailure, FailureGroup};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Namespace for group-id UUIDs. Fixed forever; group ids are stored and
/// must remain comparable across releases.
pub const GROUP_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0xa3, 0x58, 0x11, 0xf0, 0x9d, 0x2e, 0x4b, 0x67, 0x82, 0xc4, 0x5f, 0x0a, 0xee, 0x61, 0x97, 0x2d,
]);

/// Deterministic group identity for one (classifier name, title) pair.
pub fn group_id(classifier_name: &str, title: &str) -> Uuid {
    Uuid::new_v5(
        &GROUP_ID_NAMESPACE,
        format!("{classifier_name}/{title}").as_bytes(),
    )
}

/// Classification engine over an explicitly registered classifier set.
///
/// Constructed once at the composition root and shared; the classifier-set
/// fingerprint is computed at construction and cached for the lifetime of
/// the engine.
pub struct FailureGroupingEngine {
    classifiers: Vec<Arc<dyn FailureClassifier>>,
    fingerprint: String,
}

impl FailureGroupingEngine {
    pub fn new(classifiers: Vec<Arc<dyn FailureClassifier>>) -> Self {
        let fingerprint = classifier_set_fingerprint(&classifiers);
        Self {
            classifiers,
            fingerprint,
        }
    }

    /// Fingerprint of the registered classifier set
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Names of the registered classifiers, in registration order
    pub fn classifier_names(&self) -> Vec<String> {
        self.classifiers.iter().map(|c| c.name().to_string()).collect()
    }

    /// Run all registered classifiers over one failure. One group is yielded
    /// per classifier that matches; a declining classifier contributes
    /// nothing and is not an error.
    pub fn enrich(
        &self,
        failure: &ClassifiableFailure<'_>,
        occurred_at: DateTime<Utc>,
    ) -> Vec<FailureGroup> {
        let groups: Vec<FailureGroup> = self
            .classifiers
            .iter()
            .filter_map(|classifier| {
                classifier.classify(failure).map(|title| FailureGroup {
                    id: group_id(classifier.name(), &title),
                    title,
                    classifier_name: classifier.name().to_string(),
                    first: occurred_at,
                    last: occurred_at,
                })
            })
            .collect();

        debug!(
            group_count = groups.len(),
            classifier_count = self.classifiers.len(),
            "Classified failure into groups"
        );

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::default_classifiers;
    use crate::models::FailureDetails;

    fn details() -> FailureDetails {
        FailureDetails {
            exception_type: "System.TimeoutException".to_string(),
            message: "boom".to_string(),
            stack_trace: "at Sales.OrderHandler.Handle()".to_string(),
            time_of_failure: Utc::now(),
        }
    }

    #[test]
    fn enrich_yields_one_group_per_matching_classifier() {
        let engine = FailureGroupingEngine::new(default_classifiers());
        let details = details();
        let failure = ClassifiableFailure {
            message_type: Some("Sales.OrderAccepted"),
            details: &details,
            endpoint_name: Some("sales"),
            endpoint_instance: None,
            failing_endpoint_address: Some("sales@machine-a"),
        };

        let groups = engine.enrich(&failure, Utc::now());

        // endpoint-instance declines; the other four match
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().any(|g| g.classifier_name == "message-type"
            && g.title == "Sales.OrderAccepted"));
        assert!(!groups.iter().any(|g| g.classifier_name == "endpoint-instance"));
    }

    #[test]
    fn reclassification_is_idempotent() {
        let engine = FailureGroupingEngine::new(default_classifiers());
        let details = details();
        let failure = ClassifiableFailure {
            message_type: Some("Sales.OrderAccepted"),
            details: &details,
            endpoint_name: Some("sales"),
            endpoint_instance: Some("sales-1"),
            failing_endpoint_address: Some("sales@machine-a"),
        };

        let first: Vec<Uuid> = engine
            .enrich(&failure, Utc::now())
            .into_iter()
            .map(|g| g.id)
            .collect();
        let second: Vec<Uuid> = engine
            .enrich(&failure, Utc::now())
            .into_iter()
            .map(|g| g.id)
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn group_id_is_distinct_per_classifier_and_title() {
        assert_ne!(
            group_id("message-type", "Sales.OrderAccepted"),
            group_id("endpoint-name", "Sales.OrderAccepted")
        );
        assert_ne!(
            group_id("message-type", "Sales.OrderAccepted"),
            group_id("message-type", "Sales.OrderRejected")
        );
        assert_eq!(
            group_id("message-type", "Sales.OrderAccepted"),
            group_id("message-type", "Sales.OrderAccepted")
        );
    }
}
