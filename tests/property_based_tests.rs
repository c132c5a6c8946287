//! Property-based tests for the deterministic identities the grouping
//! engine depends on: group ids must be stable across calls and processes,
//! distinct for distinct inputs, and classification must be idempotent.

use chrono::Utc;
use proptest::prelude::*;
use recoverability_core::classification::{
    classifier_set_fingerprint, default_classifiers, group_id, FailureGroupingEngine,
};
use recoverability_core::models::{ClassifiableFailure, FailureDetails};
use uuid::Uuid;

// Classifier names are fixed identifiers without separators; titles are
// arbitrary human-readable text.
fn classifier_name() -> impl Strategy<Value = String> {
    "[a-z][a-z-]{0,30}"
}

fn title() -> impl Strategy<Value = String> {
    ".{1,80}"
}

proptest! {
    #[test]
    fn group_id_is_stable_across_calls(name in classifier_name(), t in title()) {
        prop_assert_eq!(group_id(&name, &t), group_id(&name, &t));
    }

    #[test]
    fn distinct_pairs_yield_distinct_ids(
        name_a in classifier_name(),
        title_a in title(),
        name_b in classifier_name(),
        title_b in title(),
    ) {
        prop_assume!((name_a.clone(), title_a.clone()) != (name_b.clone(), title_b.clone()));
        prop_assert_ne!(group_id(&name_a, &title_a), group_id(&name_b, &title_b));
    }

    #[test]
    fn group_ids_are_name_based_uuids(name in classifier_name(), t in title()) {
        let id = group_id(&name, &t);
        prop_assert_ne!(id, Uuid::nil());
        prop_assert_eq!(id.get_version_num(), 5);
    }

    #[test]
    fn classification_is_idempotent_for_arbitrary_failures(
        exception_type in "[A-Za-z][A-Za-z0-9.]{0,60}",
        message_type in proptest::option::of("[A-Za-z][A-Za-z0-9.]{0,60}"),
        stack_trace in ".{0,200}",
    ) {
        // two engine instances, as after a process restart
        let first_engine = FailureGroupingEngine::new(default_classifiers());
        let second_engine = FailureGroupingEngine::new(default_classifiers());
        let details = FailureDetails {
            exception_type,
            message: "boom".to_string(),
            stack_trace,
            time_of_failure: Utc::now(),
        };
        let failure = ClassifiableFailure {
            message_type: message_type.as_deref(),
            details: &details,
            endpoint_name: None,
            endpoint_instance: None,
            failing_endpoint_address: None,
        };

        let first: Vec<Uuid> = first_engine
            .enrich(&failure, Utc::now())
            .into_iter()
            .map(|g| g.id)
            .collect();
        let second: Vec<Uuid> = second_engine
            .enrich(&failure, Utc::now())
            .into_iter()
            .map(|g| g.id)
            .collect();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn fingerprint_is_stable_across_engine_instances(_seed in any::<u8>()) {
        prop_assert_eq!(
            classifier_set_fingerprint(&default_classifiers()),
            classifier_set_fingerprint(&default_classifiers())
        );
    }
}
