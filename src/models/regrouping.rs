//! # Regrouping Bookkeeping Models
//!
//! Durable state for the resumable legacy-regrouping sweep: a sweep-state
//! marker whose existence makes the check phase idempotent per classifier-set
//! fingerprint, and the chunked batch document the processing phase consumes
//! chunk-by-chunk.

use crate::constants::prefixes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Marker recording that a sweep has been started for one classifier-set
/// fingerprint. While it exists, repeated check-phase runs are no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegroupingSweepState {
    pub id: String,
    pub fingerprint: String,
    pub started_at: DateTime<Utc>,
}

impl RegroupingSweepState {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        Self {
            id: format!("{}{}", prefixes::REGROUPING_SWEEP_STATE, fingerprint),
            fingerprint,
            started_at: Utc::now(),
        }
    }
}

/// Ordered queue of message-id chunks awaiting re-classification. Created
/// once per stale-fingerprint detection, consumed front-to-back, deleted
/// when drained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegroupingBatch {
    pub id: String,
    pub fingerprint: String,
    chunks: VecDeque<Vec<String>>,
}

impl RegroupingBatch {
    /// Split `message_ids` into chunks of `chunk_size` preserving order.
    pub fn new(fingerprint: impl Into<String>, message_ids: Vec<String>, chunk_size: usize) -> Self {
        let fingerprint = fingerprint.into();
        let chunk_size = chunk_size.max(1);
        let chunks = message_ids
            .chunks(chunk_size)
            .map(<[String]>::to_vec)
            .collect();
        Self {
            id: format!("{}{}", prefixes::REGROUPING_BATCHES, fingerprint),
            fingerprint,
            chunks,
        }
    }

    /// Remove and return the first chunk, if any remain.
    pub fn pop_first_chunk(&mut self) -> Option<Vec<String>> {
        self.chunks.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn remaining_chunks(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_chunks_preserve_order() {
        let mut batch = RegroupingBatch::new(
            "fp-1",
            vec!["a".into(), "b".into(), "c".into()],
            1,
        );
        assert_eq!(batch.remaining_chunks(), 3);
        assert_eq!(batch.pop_first_chunk(), Some(vec!["a".to_string()]));
        assert_eq!(batch.pop_first_chunk(), Some(vec!["b".to_string()]));
        assert_eq!(batch.pop_first_chunk(), Some(vec!["c".to_string()]));
        assert!(batch.is_empty());
        assert_eq!(batch.pop_first_chunk(), None);
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let batch = RegroupingBatch::new("fp-1", vec!["a".into(), "b".into()], 0);
        assert_eq!(batch.remaining_chunks(), 2);
    }

    #[test]
    fn sweep_state_key_embeds_fingerprint() {
        let state = RegroupingSweepState::new("fp-1");
        assert_eq!(state.id, format!("{}fp-1", prefixes::REGROUPING_SWEEP_STATE));
    }
}
