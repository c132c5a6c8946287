//! Classifier-set fingerprint: the identity of the registered classifier
//! set, recorded on every failure record at classification time. A record
//! whose stored fingerprint differs from the current one was grouped by a
//! stale classifier set and is picked up by the regrouping sweep.

use crate::classification::FailureClassifier;
use std::sync::Arc;
use uuid::Uuid;

/// Namespace for fingerprint UUIDs. Fixed forever; changing it would make
/// every stored record look stale at once.
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x1c, 0x2a, 0x9e, 0x44, 0x7b, 0x5d, 0x8a, 0x91, 0x03, 0xb6, 0xe5, 0x27, 0x4c, 0xd0, 0x38,
]);

/// Deterministic fingerprint over the ordered classifier-name list.
///
/// Same classifier set (names and order) always yields the same fingerprint
/// across processes; adding, removing, or reordering classifiers changes it.
pub fn classifier_set_fingerprint(classifiers: &[Arc<dyn FailureClassifier>]) -> String {
    let names: Vec<&str> = classifiers.iter().map(|c| c.name()).collect();
    Uuid::new_v5(&FINGERPRINT_NAMESPACE, names.join("\n").as_bytes()).to_string()
}
