use serde_json::Value;
use tokio::sync::broadcast;

/// Broadcast publisher for internal domain events
#[derive(Debug, Clone)]
pub struct DomainEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

/// Event that has been raised on the bus
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub name: String,
    pub context: Value,
    pub raised_at: chrono::DateTime<chrono::Utc>,
}

impl DomainEventBus {
    /// Create a new bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Raise an event with the given name and context
    pub fn raise(&self, event_name: impl Into<String>, context: Value) -> Result<(), PublishError> {
        let event = DomainEvent {
            name: event_name.into(),
            context,
            raised_at: chrono::Utc::now(),
        };

        // For broadcast channels, send() returns an error if there are no
        // subscribers. Raising into an empty bus is acceptable here.
        match self.sender.send(event) {
            Ok(_) | Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for DomainEventBus {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
