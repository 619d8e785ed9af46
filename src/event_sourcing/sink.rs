use async_trait::async_trait;

use crate::domain::delivery::DeliveryEvent;
use super::core::EventEnvelope;

// ============================================================================
// Event Sink - where the transition engine hands off its events
// ============================================================================
//
// Publishing is fire-and-forget: a sink never reports failure back to the
// caller that produced the event. The production sink is the notification
// worker's mailbox.
//
// ============================================================================

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope<DeliveryEvent>);
}

/// Collects published envelopes in memory.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    envelopes: tokio::sync::Mutex<Vec<EventEnvelope<DeliveryEvent>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) async fn envelopes(&self) -> Vec<EventEnvelope<DeliveryEvent>> {
        self.envelopes.lock().await.clone()
    }

    pub(crate) async fn events(&self) -> Vec<DeliveryEvent> {
        self.envelopes
            .lock()
            .await
            .iter()
            .map(|envelope| envelope.event_data.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, envelope: EventEnvelope<DeliveryEvent>) {
        self.envelopes.lock().await.push(envelope);
    }
}
