//! # Retry Operation Tracking
//!
//! In-memory lifecycle tracking for bulk retry operations.
//!
//! - [`RetryOperation`]: per-operation counters and phase, advancing through
//!   the batch-retry lifecycle.
//! - [`RetryOrchestrator`]: shared registry keyed by `(request id, retry
//!   type)` that routes lifecycle events to the correct operation and
//!   answers progress queries.
//!
//! Operation state lives only in process memory for the service's lifetime:
//! a restart forgets all progress, and a second service instance would not
//! observe this one's operations. Both are accepted constraints of the
//! single-writer design, not defects.

pub mod operation;
pub mod orchestrator;

pub use operation::{RetryOperation, RetryOperationSummary, RetryPhase, RetryType};
pub use orchestrator::RetryOrchestrator;
