use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with the metadata downstream consumers need: who
// caused it, which run it belongs to, and where it sits in the aggregate's
// history.
//
// ============================================================================

/// Generic Event Envelope - wraps any domain event with metadata
///
/// Type Parameter:
/// - `E`: The domain event type (must implement DomainEvent trait)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: String,
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Groups events produced by one request or one batch run
    pub correlation_id: Uuid,

    // Who triggered this event
    pub actor: Option<String>,

    // Timing
    pub timestamp: DateTime<Utc>,

    // Additional Metadata
    pub metadata: HashMap<String, String>,
}

/// Sequence for envelopes that do not change aggregate state. Real state
/// changes start at 1.
pub const UNSEQUENCED: i64 = 0;

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_id: impl Into<String>,
        sequence_number: i64,
        event_type: impl Into<String>,
        event_data: E,
        correlation_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id: aggregate_id.into(),
            sequence_number,
            event_type: event_type.into(),
            event_version: E::event_version(),
            event_data,
            correlation_id,
            actor: None,
            timestamp,
            metadata: HashMap::new(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Generic Domain Event trait
///
/// All domain events must implement this trait to be wrapped in an envelope.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    fn event_type() -> &'static str where Self: Sized;
    fn event_version() -> i32 where Self: Sized { 1 }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct TestEvent {
        data: String,
    }

    impl DomainEvent for TestEvent {
        fn event_type() -> &'static str { "TestEvent" }
        fn event_version() -> i32 { 2 }
    }

    #[test]
    fn test_event_envelope_creation() {
        let correlation_id = Uuid::new_v4();
        let now = Utc::now();

        let envelope = EventEnvelope::new(
            "ord-1",
            1,
            TestEvent::event_type(),
            TestEvent { data: "test".to_string() },
            correlation_id,
            now,
        )
        .with_actor("admin")
        .with_metadata("delivery_date", "2026-02-03");

        assert_eq!(envelope.aggregate_id, "ord-1");
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "TestEvent");
        assert_eq!(envelope.event_version, 2);
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.actor.as_deref(), Some("admin"));
        assert_eq!(envelope.metadata.get("delivery_date").map(String::as_str), Some("2026-02-03"));
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = EventEnvelope::new(
            "ord-1",
            3,
            "TestEvent",
            TestEvent { data: "payload".to_string() },
            Uuid::new_v4(),
            Utc::now(),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        let restored: EventEnvelope<TestEvent> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, envelope);
    }
}
