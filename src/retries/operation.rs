//! # Retry Operation State Machine
//!
//! One bulk retry operation advancing through its lifecycle:
//!
//! ```text
//! NotStarted → Waiting → Preparing → Prepared → Forwarding → Completed
//!                  \________\___________\___________\→ Failed (terminal)
//! ```
//!
//! Counters accumulate across batches; `prepared_adopted_batch` merges the
//! counts of a partially-processed external batch so an operation resumed
//! after a crash does not double-count work already done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scope of a bulk retry request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryType {
    FailureGroup,
    SingleMessage,
    MultipleMessages,
    AllForEndpoint,
    All,
    ByQueueAddress,
}

impl std::fmt::Display for RetryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetryType::FailureGroup => "failure_group",
            RetryType::SingleMessage => "single_message",
            RetryType::MultipleMessages => "multiple_messages",
            RetryType::AllForEndpoint => "all_for_endpoint",
            RetryType::All => "all",
            RetryType::ByQueueAddress => "by_queue_address",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle phase of a retry operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPhase {
    NotStarted,
    Waiting,
    Preparing,
    Prepared,
    Forwarding,
    Completed,
    Failed,
}

impl RetryPhase {
    /// Completed and Failed accept no further lifecycle events except a new
    /// `wait`, which begins a fresh cycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, RetryPhase::Completed | RetryPhase::Failed)
    }
}

/// Mutable per-operation state. Owned by the orchestrator's registry; all
/// mutation happens under the registry's per-key exclusive guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOperation {
    pub request_id: String,
    pub retry_type: RetryType,
    pub phase: RetryPhase,
    pub total: usize,
    pub prepared: usize,
    pub forwarded: usize,
    pub skipped: usize,
    pub failed: bool,
    pub originator: Option<String>,
    pub classifier: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time of the most recent comparable operation, carried for
    /// operator display
    pub last: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RetryOperation {
    pub fn new(request_id: impl Into<String>, retry_type: RetryType) -> Self {
        Self {
            request_id: request_id.into(),
            retry_type,
            phase: RetryPhase::NotStarted,
            total: 0,
            prepared: 0,
            forwarded: 0,
            skipped: 0,
            failed: false,
            originator: None,
            classifier: None,
            started_at: None,
            last: None,
            completed_at: None,
        }
    }

    /// Begin a new lifecycle cycle. Resets all counters; an operation that
    /// previously completed or failed starts over from here.
    pub fn wait(
        &mut self,
        started: DateTime<Utc>,
        originator: Option<String>,
        classifier: Option<String>,
        last: Option<DateTime<Utc>>,
    ) {
        self.phase = RetryPhase::Waiting;
        self.total = 0;
        self.prepared = 0;
        self.forwarded = 0;
        self.skipped = 0;
        self.failed = false;
        self.started_at = Some(started);
        self.completed_at = None;
        if originator.is_some() {
            self.originator = originator;
        }
        if classifier.is_some() {
            self.classifier = classifier;
        }
        if last.is_some() {
            self.last = last;
        }
        self.log_transition("waiting");
    }

    /// Enter the preparing phase and fix the operation total.
    pub fn preparing(&mut self, total: usize) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = RetryPhase::Preparing;
        self.total = total;
        self.log_transition("preparing");
    }

    /// Credit a prepared batch. The phase advances to `Prepared` once every
    /// message in the operation has been prepared.
    pub fn prepared_batch(&mut self, count: usize) {
        if self.phase.is_terminal() {
            return;
        }
        self.prepared += count;
        if self.prepared >= self.total {
            self.phase = RetryPhase::Prepared;
            self.log_transition("prepared");
        }
    }

    /// Merge the counts of a partially-processed batch adopted from a
    /// previous process incarnation. Totals are raised to at least the
    /// adopted figures and the adopted prepared count is credited exactly
    /// once, so resumption never double-counts.
    #[allow(clippy::too_many_arguments)]
    pub fn prepared_adopted_batch(
        &mut self,
        prepared: usize,
        total: usize,
        originator: Option<String>,
        classifier: Option<String>,
        started: DateTime<Utc>,
        last: Option<DateTime<Utc>>,
    ) {
        if self.phase.is_terminal() {
            return;
        }
        self.total = self.total.max(total);
        self.prepared += prepared;
        if originator.is_some() {
            self.originator = originator;
        }
        if classifier.is_some() {
            self.classifier = classifier;
        }
        self.started_at.get_or_insert(started);
        if last.is_some() {
            self.last = last;
        }
        self.phase = if self.prepared >= self.total {
            RetryPhase::Prepared
        } else {
            RetryPhase::Preparing
        };
        self.log_transition("adopted batch");
    }

    /// Enter the forwarding phase.
    pub fn forwarding(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = RetryPhase::Forwarding;
        self.log_transition("forwarding");
    }

    /// Credit a forwarded batch; completes the operation once every message
    /// has been forwarded or skipped.
    pub fn forwarded_batch(&mut self, count: usize) {
        if self.phase.is_terminal() {
            return;
        }
        self.forwarded += count;
        if self.forwarded + self.skipped >= self.total {
            self.phase = RetryPhase::Completed;
            self.completed_at = Some(Utc::now());
            self.log_transition("completed");
        }
    }

    /// Flip the operation to `Failed`. Never errors; callers decide how to
    /// surface the failure.
    pub fn fail(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.failed = true;
        self.phase = RetryPhase::Failed;
        self.log_transition("failed");
    }

    /// Record skipped messages. Does not change phase; skipped messages
    /// count toward completion at the next forwarded batch.
    pub fn skip(&mut self, count: usize) {
        if self.phase.is_terminal() {
            return;
        }
        self.skipped += count;
    }

    /// An operation is in progress from `wait` until it completes or fails.
    pub fn is_in_progress(&self) -> bool {
        !matches!(self.phase, RetryPhase::NotStarted) && !self.phase.is_terminal()
    }

    pub fn summary(&self) -> RetryOperationSummary {
        RetryOperationSummary {
            request_id: self.request_id.clone(),
            retry_type: self.retry_type,
            phase: self.phase,
            total: self.total,
            prepared: self.prepared,
            forwarded: self.forwarded,
            skipped: self.skipped,
            failed: self.failed,
            originator: self.originator.clone(),
            classifier: self.classifier.clone(),
            started_at: self.started_at,
            last: self.last,
            completed_at: self.completed_at,
        }
    }

    fn log_transition(&self, transition: &str) {
        debug!(
            request_id = %self.request_id,
            retry_type = %self.retry_type,
            total = self.total,
            prepared = self.prepared,
            forwarded = self.forwarded,
            skipped = self.skipped,
            "Retry operation {transition}"
        );
    }
}

/// Immutable progress snapshot served to read APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOperationSummary {
    pub request_id: String,
    pub retry_type: RetryType,
    pub phase: RetryPhase,
    pub total: usize,
    pub prepared: usize,
    pub forwarded: usize,
    pub skipped: usize,
    pub failed: bool,
    pub originator: Option<String>,
    pub classifier: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
