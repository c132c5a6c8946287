//! # Critical Error Alerting
//!
//! Sink for alerts that need operator attention immediately, such as the
//! dispatch loop's circuit breaker opening. The hosting process wires this
//! to its monitoring integration; the default implementation logs.

use std::sync::Arc;
use tracing::error;

/// Critical-error alerting surface
pub trait CriticalErrorSink: Send + Sync {
    fn raise(&self, component: &str, message: &str);
}

/// Default sink: surfaces critical errors through structured logging
#[derive(Debug, Default)]
pub struct LogCriticalErrorSink;

impl CriticalErrorSink for LogCriticalErrorSink {
    fn raise(&self, component: &str, message: &str) {
        error!(component = %component, "🚨 Critical error: {message}");
    }
}

/// Convenience alias used across component constructors
pub type SharedCriticalErrorSink = Arc<dyn CriticalErrorSink>;
