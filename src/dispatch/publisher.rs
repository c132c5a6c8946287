//! Integration event publisher seam.

use crate::messaging::OutboundEvent;
use crate::models::DispatchContext;
use async_trait::async_trait;

/// Derives externally visible integration events from a batch of dispatch
/// contexts.
///
/// A publisher sees the whole batch at once and may emit zero, one, or many
/// events for it; the dispatch loop never assumes a 1:1 mapping to
/// requests. Derivation failure is an iteration-level error: it aborts the
/// current dispatch pass and counts against the loop's circuit breaker.
#[async_trait]
pub trait IntegrationEventPublisher: Send + Sync {
    /// Derive the integration events for one batch of dispatch contexts.
    async fn publish_events(&self, batch: &[DispatchContext]) -> anyhow::Result<Vec<OutboundEvent>>;

    /// Publisher name for logging and error attribution
    fn name(&self) -> &str {
        "unnamed_publisher"
    }
}
