//! # Test Helpers
//!
//! Shared builders and recording doubles for the collaborator seams,
//! used by unit tests and the integration suites.

use crate::alerting::CriticalErrorSink;
use crate::error::{RecoverabilityError, Result};
use crate::messaging::{ControlMessage, MessageSession, OutboundEvent};
use crate::models::{DispatchContext, FailureDetails, FailureRecord, ProcessingAttempt};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::HashSet;

/// A realistic failure record with one processing attempt
pub fn failure_record(message_id: &str, exception_type: &str) -> FailureRecord {
    FailureRecord::new(message_id, processing_attempt(exception_type))
}

/// A processing attempt carrying enough context for every built-in
/// classifier except endpoint-instance
pub fn processing_attempt(exception_type: &str) -> ProcessingAttempt {
    ProcessingAttempt {
        attempted_at: Utc::now(),
        failure: FailureDetails {
            exception_type: exception_type.to_string(),
            message: format!("{exception_type} was thrown"),
            stack_trace: "at Sales.OrderHandler.Handle()".to_string(),
            time_of_failure: Utc::now(),
        },
        message_type: Some("Sales.OrderAccepted".to_string()),
        endpoint_name: Some("sales".to_string()),
        endpoint_instance: None,
        failing_endpoint_address: Some("sales@machine-a".to_string()),
        metadata: HashMap::new(),
    }
}

/// Message session double that records traffic and can be told to fail
/// publishes of specific event types
#[derive(Default)]
pub struct RecordingSession {
    sent_local: Mutex<Vec<ControlMessage>>,
    published: Mutex<Vec<OutboundEvent>>,
    failing_event_types: Mutex<HashSet<String>>,
}

impl RecordingSession {
    pub fn fail_publishes_of(&self, event_type: &str) {
        self.failing_event_types
            .lock()
            .insert(event_type.to_string());
    }

    pub fn sent_local(&self) -> Vec<ControlMessage> {
        self.sent_local.lock().clone()
    }

    pub fn published(&self) -> Vec<OutboundEvent> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl MessageSession for RecordingSession {
    async fn send_local(&self, message: ControlMessage) -> Result<()> {
        self.sent_local.lock().push(message);
        Ok(())
    }

    async fn publish(&self, event: OutboundEvent) -> Result<()> {
        if self.failing_event_types.lock().contains(&event.event_type) {
            return Err(RecoverabilityError::MessagingError(format!(
                "simulated publish failure for {}",
                event.event_type
            )));
        }
        self.published.lock().push(event);
        Ok(())
    }
}

/// Critical-error sink double that records raised alerts
#[derive(Default)]
pub struct RecordingAlertSink {
    raised: Mutex<Vec<(String, String)>>,
}

impl RecordingAlertSink {
    pub fn raised(&self) -> Vec<(String, String)> {
        self.raised.lock().clone()
    }
}

impl CriticalErrorSink for RecordingAlertSink {
    fn raise(&self, component: &str, message: &str) {
        self.raised
            .lock()
            .push((component.to_string(), message.to_string()));
    }
}

/// Publisher double deriving exactly one outbound event per dispatch
/// context, preserving order
pub struct ContextEchoPublisher;

#[async_trait]
impl crate::dispatch::IntegrationEventPublisher for ContextEchoPublisher {
    async fn publish_events(&self, batch: &[DispatchContext]) -> anyhow::Result<Vec<OutboundEvent>> {
        Ok(batch
            .iter()
            .map(|context| OutboundEvent::new(context.event_type.clone(), context.payload.clone()))
            .collect())
    }

    fn name(&self) -> &str {
        "context_echo"
    }
}
