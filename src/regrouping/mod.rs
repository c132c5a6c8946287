//! # Legacy Regrouping Sweep
//!
//! Background, resumable re-classification of failures grouped under a
//! stale classifier set.
//!
//! ## Two phases
//!
//! 1. **Check** ([`LegacyRegroupingSweep`]): runs at startup (and whenever
//!    the classifier set may have changed). If no sweep-state marker exists
//!    for the current classifier-set fingerprint, it probes for stale
//!    failures with a deliberately tiny discovery query, persists the
//!    marker plus a chunked batch document, and enqueues the first
//!    processing pass through the messaging runtime.
//! 2. **Processing** ([`RegroupingProcessor`]): handles the continuation
//!    message. Each pass re-classifies a bounded batch drawn from two query
//!    shapes (group-less failures first, then failures missing at least one
//!    registered classifier), persists memberships and progress atomically,
//!    and re-enqueues itself while the store reports more work than the
//!    pass consumed.
//!
//! The marker makes the whole sweep idempotent per fingerprint: a second
//! check against an unchanged classifier set is a no-op.

pub mod processor;
pub mod sweep;

pub use processor::{ProcessOutcome, RegroupingProcessor};
pub use sweep::{LegacyRegroupingSweep, SweepOutcome};
