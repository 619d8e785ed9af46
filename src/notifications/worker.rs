use std::sync::Arc;

use async_trait::async_trait;
use kameo::Actor;
use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::message::{Context, Message};

use crate::domain::delivery::DeliveryEvent;
use crate::event_sourcing::{EventEnvelope, EventSink};
use crate::metrics::Metrics;
use crate::utils::{retry_with_backoff, RetryConfig};
use super::dispatcher::{NotificationDispatcher, NotificationKind, NotificationPayload};

// ============================================================================
// Notification Worker Actor
// ============================================================================
//
// Responsibilities:
// - Receive delivery events fire-and-forget from the engine
// - Pick the notification template for each event
// - Call the dispatcher with exponential backoff
// - Record sent/failed notifications
//
// A failed notification is logged and counted; it never flows back into the
// transition that produced it.
//
// ============================================================================

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
pub struct DispatchEvent(pub EventEnvelope<DeliveryEvent>);

// ============================================================================
// Notification Worker
// ============================================================================

pub struct NotificationWorker {
    dispatcher: Arc<dyn NotificationDispatcher>,
    retry_config: RetryConfig,
    metrics: Arc<Metrics>,
}

impl NotificationWorker {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        retry_config: RetryConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            dispatcher,
            retry_config,
            metrics,
        }
    }

    /// Send the notification for one event. Returns the kind that was sent,
    /// or `None` when the event has no template.
    pub async fn deliver(
        &self,
        envelope: &EventEnvelope<DeliveryEvent>,
    ) -> anyhow::Result<Option<NotificationKind>> {
        let event = &envelope.event_data;
        let Some(kind) = NotificationKind::for_event(event) else {
            tracing::debug!(
                event_id = %envelope.event_id,
                event_type = %envelope.event_type,
                "No notification template for event"
            );
            return Ok(None);
        };

        let contact = event.customer().clone();
        let payload = NotificationPayload::from_event(event);
        let dispatcher = self.dispatcher.clone();

        let result = retry_with_backoff(&self.retry_config, |attempt| {
            let dispatcher = dispatcher.clone();
            let contact = contact.clone();
            let payload = payload.clone();

            async move {
                tracing::debug!(
                    attempt = attempt,
                    kind = %kind,
                    order_id = %payload.order_id,
                    "Dispatching notification"
                );
                dispatcher.notify(&contact, kind, &payload).await
            }
        })
        .await;

        match result {
            Ok(()) => {
                self.metrics.record_notification(kind.as_str(), true);
                tracing::info!(
                    kind = %kind,
                    order_id = %envelope.aggregate_id,
                    correlation_id = %envelope.correlation_id,
                    "✅ Notification dispatched"
                );
                Ok(Some(kind))
            }
            Err(exhausted) => {
                self.metrics.record_notification(kind.as_str(), false);
                Err(anyhow::anyhow!(
                    "{} notification for order {} failed: {}",
                    kind,
                    envelope.aggregate_id,
                    exhausted
                ))
            }
        }
    }
}

impl Actor for NotificationWorker {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(
        state: Self::Args,
        _actor_ref: ActorRef<Self>
    ) -> Result<Self, Self::Error> {
        tracing::info!(
            max_attempts = state.retry_config.max_attempts,
            "NotificationWorker started"
        );
        Ok(state)
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<DispatchEvent> for NotificationWorker {
    type Reply = ();

    async fn handle(&mut self, msg: DispatchEvent, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        if let Err(e) = self.deliver(&msg.0).await {
            tracing::error!(
                error = %e,
                event_id = %msg.0.event_id,
                "❌ Dropping notification after retries"
            );
        }
    }
}

// The engine publishes straight into the worker's mailbox.
#[async_trait]
impl EventSink for ActorRef<NotificationWorker> {
    async fn publish(&self, envelope: EventEnvelope<DeliveryEvent>) {
        let event_id = envelope.event_id;

        // Fire and forget - use tell
        if self.tell(DispatchEvent(envelope)).send().await.is_err() {
            tracing::warn!(
                event_id = %event_id,
                "NotificationWorker unavailable, event not dispatched"
            );
        }
    }
}
