//! # Failure Classification
//!
//! Turns raw failure details into stable triage groups.
//!
//! ## Architecture
//!
//! - [`FailureClassifier`]: pure strategy mapping one failure to an optional
//!   classification title. Returning `None` means "not applicable", never an
//!   error.
//! - [`FailureGroupingEngine`]: runs every registered classifier over one
//!   failure and yields one [`crate::models::FailureGroup`] per match, with
//!   deterministic content-addressed group ids.
//! - [`classifier_set_fingerprint`]: identity of the registered classifier
//!   set, used to detect records grouped under a stale set.
//!
//! Classifiers are assembled explicitly at the composition root (see
//! [`default_classifiers`]); there is no runtime type scanning.

pub mod classifier;
pub mod fingerprint;
pub mod grouping;

pub use classifier::{
    default_classifiers, EndpointInstanceClassifier, EndpointNameClassifier,
    ExceptionTypeAndStackTraceClassifier, FailingEndpointAddressClassifier, FailureClassifier,
    MessageTypeClassifier,
};
pub use fingerprint::classifier_set_fingerprint;
pub use grouping::{group_id, FailureGroupingEngine, GROUP_ID_NAMESPACE};
