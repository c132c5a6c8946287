//! # Built-in Failure Classifiers
//!
//! Each classifier is a pure strategy over one failure's context. The
//! infallible `Option<String>` signature is deliberate: a classifier can
//! decline a failure but cannot fail it, so batch re-classification never
//! aborts on classifier behavior.

use crate::models::ClassifiableFailure;
use std::sync::Arc;

/// Pure function from failure context to an optional classification title.
///
/// The `name` doubles as the group-type tag and as one half of the
/// deterministic group identity, so it must stay stable across releases.
pub trait FailureClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classification title for this failure, or `None` when the classifier
    /// does not apply.
    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String>;
}

/// Groups failures thrown with the same exception type at the same top
/// stack frame.
pub struct ExceptionTypeAndStackTraceClassifier;

impl ExceptionTypeAndStackTraceClassifier {
    /// First meaningful frame of a stack trace: the first non-empty line,
    /// with a leading `at ` marker stripped.
    fn first_stack_frame(stack_trace: &str) -> Option<&str> {
        stack_trace
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.strip_prefix("at ").unwrap_or(line))
    }
}

impl FailureClassifier for ExceptionTypeAndStackTraceClassifier {
    fn name(&self) -> &'static str {
        "exception-type-and-stack-trace"
    }

    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String> {
        let exception_type = failure.details.exception_type.trim();
        if exception_type.is_empty() {
            return None;
        }
        match Self::first_stack_frame(&failure.details.stack_trace) {
            Some(frame) => Some(format!("{exception_type} at {frame}")),
            None => Some(exception_type.to_string()),
        }
    }
}

/// Groups failures of the same logical message type
pub struct MessageTypeClassifier;

impl FailureClassifier for MessageTypeClassifier {
    fn name(&self) -> &'static str {
        "message-type"
    }

    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String> {
        failure
            .message_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// Groups failures by the transport address of the failing endpoint
pub struct FailingEndpointAddressClassifier;

impl FailureClassifier for FailingEndpointAddressClassifier {
    fn name(&self) -> &'static str {
        "failing-endpoint-address"
    }

    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String> {
        failure
            .failing_endpoint_address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
    }
}

/// Groups failures by logical endpoint name
pub struct EndpointNameClassifier;

impl FailureClassifier for EndpointNameClassifier {
    fn name(&self) -> &'static str {
        "endpoint-name"
    }

    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String> {
        failure
            .endpoint_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Groups failures by the specific endpoint instance that processed them
pub struct EndpointInstanceClassifier;

impl FailureClassifier for EndpointInstanceClassifier {
    fn name(&self) -> &'static str {
        "endpoint-instance"
    }

    fn classify(&self, failure: &ClassifiableFailure<'_>) -> Option<String> {
        failure
            .endpoint_instance
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string)
    }
}

/// The classifier set registered at startup by the composition root.
/// Order matters: it feeds the classifier-set fingerprint.
pub fn default_classifiers() -> Vec<Arc<dyn FailureClassifier>> {
    vec![
        Arc::new(ExceptionTypeAndStackTraceClassifier),
        Arc::new(MessageTypeClassifier),
        Arc::new(FailingEndpointAddressClassifier),
        Arc::new(EndpointNameClassifier),
        Arc::new(EndpointInstanceClassifier),
    ]
}
