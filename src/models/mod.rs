//! # Data Models
//!
//! Records owned by the recoverability subsystem: failure records with their
//! processing attempts and group memberships, pending dispatch requests
//! awaiting external publication, and the resumable regrouping bookkeeping
//! documents.
//!
//! Durable records (everything except retry-operation state, which lives in
//! process memory) carry serde derives and are stored/loaded through the
//! [`crate::storage::RecoverabilityStore`] contract.

pub mod dispatch;
pub mod failure;
pub mod regrouping;

pub use dispatch::{DispatchContext, PendingDispatchRequest};
pub use failure::{
    ClassifiableFailure, FailureDetails, FailureGroup, FailureGroupView, FailureRecord,
    FailureStatus, ProcessingAttempt,
};
pub use regrouping::{RegroupingBatch, RegroupingSweepState};
