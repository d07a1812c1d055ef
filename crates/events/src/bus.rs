//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Producers of dataset events and the worker's consumer share one
//! [`EventBus`]; events are project-scoped [`PlatformEvent`] envelopes.

use chrono::{DateTime, Utc};
use geti_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// An event scoped to one project.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_source`](PlatformEvent::with_source) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"dataset.updated"`.
    pub event_type: String,

    pub workspace_id: DbId,
    pub project_id: DbId,

    /// Optional source entity kind (e.g. `"task"`, `"model"`).
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,

    /// Event-specific JSON payload.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>, workspace_id: DbId, project_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            workspace_id,
            project_id,
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Decode the payload into its typed form.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Events buffered per receiver before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus: every subscriber sees every event published after it
/// subscribed.
///
/// ```rust
/// use geti_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::new(16);
/// let _worker = bus.subscribe();
/// assert_eq!(bus.publish(PlatformEvent::new("label_schema.changed", 1, 2)), 1);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// A full buffer overwrites the oldest event; receivers that had not
    /// read it get `RecvError::Lagged` with the number they missed.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Returns how many
    /// subscribers will see it; with none the event is dropped.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        let event_type = event.event_type.clone();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(%event_type, "No subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
