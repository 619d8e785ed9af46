use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::delivery::{
    build_monthly_calendar, generate_calendar, month_bounds, next_day_deliveries, next_delivery_after,
    DateIndex, DeliveryDay, DeliveryError, DeliveryEvent, DeliveryStatus, MonthlyCalendar,
    NewSubscription, OrderStatistics, SubscriptionOrder, UpcomingDelivery,
};
use crate::event_sourcing::{EventEnvelope, EventSink, UNSEQUENCED};
use crate::metrics::Metrics;
use crate::store::{AppliedTransition, OrderStore, TransitionRequest};

mod batch;

pub use batch::{BatchFailure, BatchReport};

// ============================================================================
// Delivery Service - the engine's public surface
// ============================================================================
//
// Orders live in the `OrderStore`; side effects go out through the
// `EventSink`. The only state kept here is which (order, date) reminders have
// already been queued, so each upcoming delivery is announced once. Every
// operation that depends on "today" takes the date from its caller.
//
// ============================================================================

const SINGLE_PATH: &str = "single";

pub struct DeliveryService {
    store: Arc<dyn OrderStore>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<Metrics>,
    config: EngineConfig,
    reminded: Mutex<HashSet<(String, NaiveDate)>>,
}

impl DeliveryService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<Metrics>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sink,
            metrics,
            config,
            reminded: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Day-by-day schedule for a date range, using the configured rest day.
    pub fn generate_calendar_for_order(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DeliveryDay>, DeliveryError> {
        generate_calendar(start, end, self.config.rest_weekday)
    }

    /// Create an order with its calendar and persist it.
    pub async fn register_order(&self, draft: NewSubscription) -> Result<SubscriptionOrder, DeliveryError> {
        let order = SubscriptionOrder::create(draft, self.config.rest_weekday)?;
        self.store.insert_order(order.clone()).await?;

        tracing::info!(
            order_id = %order.id,
            start = %order.start_date,
            end = %order.end_date,
            deliveries = order.statistics().total_days,
            "📝 Subscription order registered"
        );

        Ok(order)
    }

    /// Move one order's record for `date` to `target`.
    ///
    /// Returns the record as stored afterwards. Asking for the status the
    /// record already has succeeds without recording or publishing anything.
    pub async fn transition_single_delivery(
        &self,
        order_id: &str,
        date: NaiveDate,
        target: DeliveryStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<DeliveryDay, DeliveryError> {
        let request = TransitionRequest {
            order_id: order_id.to_string(),
            date,
            target,
            actor: actor.to_string(),
            at,
        };

        let applied = match self.store.apply_transition(&request).await {
            Ok(applied) => applied,
            Err(e) => {
                let error = DeliveryError::from(e);
                self.metrics.record_transition_failure(error.kind(), SINGLE_PATH);
                tracing::warn!(
                    order_id = %order_id,
                    date = %date,
                    target = %target,
                    error = %error,
                    "Delivery transition rejected"
                );
                return Err(error);
            }
        };

        let day = applied
            .order
            .delivery_on(date)
            .cloned()
            .ok_or_else(|| DeliveryError::DeliveryNotFound {
                order_id: order_id.to_string(),
                date,
            })?;

        if !applied.changed() {
            tracing::debug!(order_id = %order_id, date = %date, status = %day.status, "Delivery already at target status");
            return Ok(day);
        }

        self.metrics.record_transition(target.as_str(), SINGLE_PATH);
        tracing::info!(
            order_id = %order_id,
            date = %date,
            to = %target,
            actor = %actor,
            "✅ Delivery status updated"
        );

        let correlation_id = Uuid::new_v4();
        self.publish_applied(&applied, correlation_id, actor, at).await;

        if target == DeliveryStatus::Delivered {
            if let Some(upcoming) = next_delivery_after(&applied.order, date) {
                self.publish_reminder(&upcoming, correlation_id, actor, at).await;
            }
        }

        Ok(day)
    }

    pub async fn get_order_statistics(&self, order_id: &str) -> Result<OrderStatistics, DeliveryError> {
        let order = self.store.fetch_order(order_id).await?;
        Ok(order.statistics())
    }

    pub async fn get_monthly_calendar(&self, year: i32, month: u32) -> Result<MonthlyCalendar, DeliveryError> {
        let (first, last) = month_bounds(year, month)?;
        let orders = self.store.fetch_all_orders().await?;

        let index = DateIndex::for_range(&orders, first, last);
        build_monthly_calendar(&index, year, month)
    }

    /// Deliveries due on the day after `reference_date`.
    pub async fn get_next_day_deliveries(
        &self,
        reference_date: NaiveDate,
    ) -> Result<Vec<UpcomingDelivery>, DeliveryError> {
        let orders = self.store.fetch_all_orders().await?;
        Ok(next_day_deliveries(&orders, reference_date))
    }

    // ========================================================================
    // Event publication
    // ========================================================================

    async fn publish_applied(
        &self,
        applied: &AppliedTransition,
        correlation_id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) {
        // The order's version already counts these events.
        let first_sequence = applied.order.version - applied.events.len() as i64 + 1;

        for (offset, event) in applied.events.iter().enumerate() {
            let envelope = envelope_for(
                event.clone(),
                first_sequence + offset as i64,
                correlation_id,
                actor,
                at,
            );
            self.sink.publish(envelope).await;
        }
    }

    /// Returns false when this delivery was already announced.
    async fn publish_reminder(
        &self,
        upcoming: &UpcomingDelivery,
        correlation_id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let key = (upcoming.order_id.clone(), upcoming.date);
        if !self.reminded.lock().await.insert(key) {
            tracing::debug!(
                order_id = %upcoming.order_id,
                date = %upcoming.date,
                "Reminder already queued"
            );
            return false;
        }

        tracing::debug!(
            order_id = %upcoming.order_id,
            date = %upcoming.date,
            delivery_index = upcoming.delivery_index,
            "Queueing next delivery reminder"
        );

        let event = DeliveryEvent::NextDeliveryDue(upcoming.to_event());
        // Reminders sit outside the order's state stream
        let envelope = envelope_for(event, UNSEQUENCED, correlation_id, actor, at);
        self.sink.publish(envelope).await;
        true
    }
}

fn envelope_for(
    event: DeliveryEvent,
    sequence_number: i64,
    correlation_id: Uuid,
    actor: &str,
    at: DateTime<Utc>,
) -> EventEnvelope<DeliveryEvent> {
    let order_id = event.order_id().to_string();
    let date = event.date().to_string();
    let event_type = event.name();

    EventEnvelope::new(order_id, sequence_number, event_type, event, correlation_id, at)
        .with_actor(actor)
        .with_metadata("delivery_date", date)
}
