use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::delivery::{is_eligible, next_day_deliveries, DeliveryError, DeliveryStatus};
use crate::store::TransitionRequest;
use super::DeliveryService;

// ============================================================================
// Batch Transition for a Date
// ============================================================================
//
// Every eligible order is attempted on its own. One order failing never
// stops the others, and nothing already applied is rolled back when the
// batch is cancelled.
//
// ============================================================================

const BATCH_PATH: &str = "batch";

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub order_id: String,
    pub error: DeliveryError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub date: NaiveDate,
    pub target: DeliveryStatus,
    /// Shared by every event the batch published.
    pub correlation_id: Uuid,
    /// Eligible orders whose record now holds the target status.
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
    /// Eligible orders skipped because the batch was cancelled first.
    pub not_attempted: Vec<String>,
    pub cancelled: bool,
    /// Reminders queued by the lookahead refresh.
    pub next_day_reminders: usize,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Turn a report with failures into `PartialBatchFailure`.
    pub fn ensure_complete(&self) -> Result<(), DeliveryError> {
        if self.failed.is_empty() {
            return Ok(());
        }

        Err(DeliveryError::PartialBatchFailure {
            date: self.date,
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
        })
    }
}

enum Outcome {
    /// `changed` is false when the record already held the target.
    Succeeded { changed: bool },
    Failed(DeliveryError),
    NotAttempted,
}

impl DeliveryService {
    /// Move every eligible order's record on `date` to `target`.
    ///
    /// Eligible means the record exists, is not a rest day and sits below
    /// `target`. Ineligible orders are neither touched nor reported.
    pub async fn batch_transition_for_date(
        &self,
        date: NaiveDate,
        target: DeliveryStatus,
        actor: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, DeliveryError> {
        if !matches!(target, DeliveryStatus::OutForDelivery | DeliveryStatus::Delivered) {
            let error = DeliveryError::InvalidBatchTarget(target);
            self.metrics.record_transition_failure(error.kind(), BATCH_PATH);
            return Err(error);
        }

        let started = Instant::now();
        let correlation_id = Uuid::new_v4();

        let orders = self.store.fetch_all_orders().await?;
        let eligible: Vec<String> = orders
            .iter()
            .filter(|order| order.delivery_on(date).is_some_and(|day| is_eligible(day, target)))
            .map(|order| order.id.clone())
            .collect();

        tracing::info!(
            date = %date,
            target = %target,
            eligible = eligible.len(),
            orders = orders.len(),
            correlation_id = %correlation_id,
            "🚚 Starting batch transition"
        );

        let outcomes: Vec<(String, Outcome)> = stream::iter(eligible)
            .map(|order_id| async move {
                if cancel.is_cancelled() {
                    return (order_id, Outcome::NotAttempted);
                }

                let outcome = self.transition_in_batch(&order_id, date, target, actor, at, correlation_id).await;
                (order_id, outcome)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut report = BatchReport {
            date,
            target,
            correlation_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
            not_attempted: Vec::new(),
            cancelled: cancel.is_cancelled(),
            next_day_reminders: 0,
        };

        let mut changed = 0;
        for (order_id, outcome) in outcomes {
            match outcome {
                Outcome::Succeeded { changed: true } => {
                    changed += 1;
                    report.succeeded.push(order_id);
                }
                Outcome::Succeeded { changed: false } => report.succeeded.push(order_id),
                Outcome::Failed(error) => report.failed.push(BatchFailure { order_id, error }),
                Outcome::NotAttempted => report.not_attempted.push(order_id),
            }
        }
        report.cancelled = report.cancelled || !report.not_attempted.is_empty();

        if target == DeliveryStatus::Delivered && changed > 0 {
            report.next_day_reminders = self.refresh_lookahead(date, correlation_id, actor, at).await;
        }

        self.metrics.record_batch(
            target.as_str(),
            report.succeeded.len(),
            report.failed.len(),
            report.cancelled,
            started.elapsed().as_secs_f64(),
        );

        if report.failed.is_empty() {
            tracing::info!(
                date = %date,
                target = %target,
                succeeded = report.succeeded.len(),
                not_attempted = report.not_attempted.len(),
                reminders = report.next_day_reminders,
                "✅ Batch transition finished"
            );
        } else {
            tracing::warn!(
                date = %date,
                target = %target,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                not_attempted = report.not_attempted.len(),
                "⚠️ Batch transition finished with failures"
            );
        }

        Ok(report)
    }

    async fn transition_in_batch(
        &self,
        order_id: &str,
        date: NaiveDate,
        target: DeliveryStatus,
        actor: &str,
        at: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Outcome {
        let request = TransitionRequest {
            order_id: order_id.to_string(),
            date,
            target,
            actor: actor.to_string(),
            at,
        };

        match self.store.apply_transition(&request).await {
            Ok(applied) => {
                // Someone else may have applied the same change first
                let changed = applied.changed();
                if changed {
                    self.metrics.record_transition(target.as_str(), BATCH_PATH);
                    self.publish_applied(&applied, correlation_id, actor, at).await;
                }
                Outcome::Succeeded { changed }
            }
            Err(e) => {
                let error = DeliveryError::from(e);
                self.metrics.record_transition_failure(error.kind(), BATCH_PATH);
                tracing::warn!(
                    order_id = %order_id,
                    date = %date,
                    error = %error,
                    "Batch transition failed for order"
                );
                Outcome::Failed(error)
            }
        }
    }

    /// Queue one reminder per delivery due the day after `date` that has not
    /// been announced yet. Returns how many were queued.
    async fn refresh_lookahead(
        &self,
        date: NaiveDate,
        correlation_id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> usize {
        let orders = match self.store.fetch_all_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(date = %date, error = %e, "Lookahead refresh skipped");
                return 0;
            }
        };

        let mut queued = 0;
        for delivery in next_day_deliveries(&orders, date) {
            if self.publish_reminder(&delivery, correlation_id, actor, at).await {
                queued += 1;
            }
        }

        queued
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::delivery::aggregate::tests::{create_test_order, ymd};
    use crate::domain::delivery::{DeliveryEvent, SubscriptionOrder};
    use crate::service::tests::{at, test_service};
    use crate::store::{AppliedTransition, InMemoryOrderStore, OrderStore, StoreError};

    /// Wraps the in-memory store, failing writes for chosen orders and
    /// optionally cancelling a token after the first write.
    struct FailingStore {
        inner: InMemoryOrderStore,
        failing: HashSet<String>,
        cancel_after_first: Option<CancellationToken>,
    }

    impl FailingStore {
        fn new(orders: Vec<SubscriptionOrder>, failing: &[&str]) -> Self {
            Self {
                inner: InMemoryOrderStore::with_orders(orders),
                failing: failing.iter().map(|id| id.to_string()).collect(),
                cancel_after_first: None,
            }
        }
    }

    #[async_trait]
    impl OrderStore for FailingStore {
        async fn fetch_all_orders(&self) -> Result<Vec<SubscriptionOrder>, StoreError> {
            self.inner.fetch_all_orders().await
        }

        async fn fetch_order(&self, order_id: &str) -> Result<SubscriptionOrder, StoreError> {
            self.inner.fetch_order(order_id).await
        }

        async fn apply_transition(&self, request: &TransitionRequest) -> Result<AppliedTransition, StoreError> {
            if self.failing.contains(&request.order_id) {
                return Err(StoreError::Unavailable("write timed out".to_string()));
            }
            let applied = self.inner.apply_transition(request).await;
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            applied
        }

        async fn insert_order(&self, order: SubscriptionOrder) -> Result<(), StoreError> {
            self.inner.insert_order(order).await
        }
    }

    /// Seven orders cover 2026-02-03, three start the day after.
    fn ten_orders() -> Vec<SubscriptionOrder> {
        (1..=10)
            .map(|n| {
                let start = if n <= 7 { ymd(2026, 2, 2) } else { ymd(2026, 2, 4) };
                create_test_order(&format!("ord-{:02}", n), start, ymd(2026, 2, 14))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_attempts_only_orders_scheduled_that_day() {
        let store = Arc::new(InMemoryOrderStore::with_orders(ten_orders()));
        let (service, sink, _metrics) = test_service(store.clone());

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::OutForDelivery, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.attempted(), 7);
        assert_eq!(report.succeeded.len(), 7);
        assert!(report.failed.is_empty());
        assert!(!report.succeeded.iter().any(|id| id == "ord-08" || id == "ord-09" || id == "ord-10"));
        assert_eq!(report.next_day_reminders, 0);
        assert!(report.ensure_complete().is_ok());

        let envelopes = sink.envelopes().await;
        assert_eq!(envelopes.len(), 7);
        assert!(envelopes.iter().all(|e| e.correlation_id == report.correlation_id));

        let untouched = store.fetch_order("ord-08").await.unwrap();
        assert!(untouched.deliveries.iter().all(|day| day.history.is_empty()));
    }

    #[tokio::test]
    async fn test_batch_reports_order_in_eligible_sequence() {
        let (service, _sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(ten_orders())));

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::Delivered, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        let expected: Vec<String> = (1..=7).map(|n| format!("ord-{:02}", n)).collect();
        assert_eq!(report.succeeded, expected);
    }

    #[tokio::test]
    async fn test_batch_captures_failures_without_aborting() {
        let store = FailingStore::new(ten_orders(), &["ord-02", "ord-05"]);
        let (service, _sink, metrics) = test_service(Arc::new(store));

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::OutForDelivery, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 5);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].order_id, "ord-02");
        assert!(matches!(report.failed[0].error, DeliveryError::StoreUnavailable(_)));
        assert_eq!(
            report.ensure_complete().unwrap_err(),
            DeliveryError::PartialBatchFailure {
                date: ymd(2026, 2, 3),
                succeeded: 5,
                failed: 2,
            }
        );
        assert_eq!(metrics.batch_runs.with_label_values(&["out_for_delivery", "partial"]).get(), 1);
    }

    #[tokio::test]
    async fn test_batch_skips_orders_already_at_or_past_target() {
        let store = Arc::new(InMemoryOrderStore::with_orders(ten_orders()));
        let (service, _sink, _metrics) = test_service(store.clone());
        let date = ymd(2026, 2, 3);
        service.transition_single_delivery("ord-01", date, DeliveryStatus::Delivered, "admin", at()).await.unwrap();
        service.transition_single_delivery("ord-02", date, DeliveryStatus::OutForDelivery, "admin", at()).await.unwrap();

        let report = service
            .batch_transition_for_date(date, DeliveryStatus::OutForDelivery, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.attempted(), 5);
        assert!(!report.succeeded.contains(&"ord-01".to_string()));
        assert!(!report.succeeded.contains(&"ord-02".to_string()));
        assert_eq!(
            store.fetch_order("ord-01").await.unwrap().delivery_on(date).unwrap().status,
            DeliveryStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_batch_rejects_pending_target() {
        let (service, _sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(ten_orders())));

        let result = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::Pending, "admin", at(), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), DeliveryError::InvalidBatchTarget(DeliveryStatus::Pending));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_attempts_nothing() {
        let store = Arc::new(InMemoryOrderStore::with_orders(ten_orders()));
        let (service, sink, _metrics) = test_service(store.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::OutForDelivery, "admin", at(), &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.attempted(), 0);
        assert_eq!(report.not_attempted.len(), 7);
        assert!(sink.envelopes().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_applied_transitions() {
        let cancel = CancellationToken::new();
        let mut store = FailingStore::new(ten_orders(), &[]);
        store.cancel_after_first = Some(cancel.clone());
        let store = Arc::new(store);

        let sink = Arc::new(crate::event_sourcing::RecordingSink::default());
        let config = crate::config::EngineConfig {
            batch_concurrency: 1,
            ..Default::default()
        };
        let service = DeliveryService::new(
            store.clone(),
            sink.clone(),
            Arc::new(crate::metrics::Metrics::new().unwrap()),
            config,
        );

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::OutForDelivery, "admin", at(), &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.succeeded, vec!["ord-01".to_string()]);
        assert_eq!(report.not_attempted.len(), 6);
        assert_eq!(
            store.fetch_order("ord-01").await.unwrap().delivery_on(ymd(2026, 2, 3)).unwrap().status,
            DeliveryStatus::OutForDelivery
        );
    }

    #[tokio::test]
    async fn test_delivered_batch_refreshes_lookahead_once() {
        let (service, sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(ten_orders())));

        let report = service
            .batch_transition_for_date(ymd(2026, 2, 3), DeliveryStatus::Delivered, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        // All ten orders deliver on 2026-02-04
        assert_eq!(report.next_day_reminders, 10);

        let events = sink.events().await;
        let reminders: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                DeliveryEvent::NextDeliveryDue(due) => Some(due),
                _ => None,
            })
            .collect();
        assert_eq!(reminders.len(), 10);
        assert!(reminders.iter().all(|due| due.date == ymd(2026, 2, 4)));

        let status_changes = events.iter().filter(|e| matches!(e, DeliveryEvent::StatusChanged(_))).count();
        assert_eq!(status_changes, 7);
    }

    #[tokio::test]
    async fn test_rerunning_batch_publishes_nothing_new() {
        let (service, sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(ten_orders())));
        let date = ymd(2026, 2, 3);

        service
            .batch_transition_for_date(date, DeliveryStatus::OutForDelivery, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();
        let second = service
            .batch_transition_for_date(date, DeliveryStatus::OutForDelivery, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(second.attempted(), 0);
        assert_eq!(sink.envelopes().await.len(), 7);
    }

    fn reminders(events: &[DeliveryEvent]) -> Vec<(String, NaiveDate)> {
        events
            .iter()
            .filter_map(|event| match event {
                DeliveryEvent::NextDeliveryDue(due) => Some((due.order_id.clone(), due.date)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rerunning_delivered_batch_sends_no_new_reminders() {
        let (service, sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(vec![
            create_test_order("ord-01", ymd(2026, 2, 2), ymd(2026, 2, 14)),
        ])));
        let date = ymd(2026, 2, 3);
        service.transition_single_delivery("ord-01", date, DeliveryStatus::Delivered, "admin", at()).await.unwrap();

        for _ in 0..2 {
            let report = service
                .batch_transition_for_date(date, DeliveryStatus::Delivered, "admin", at(), &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(report.attempted(), 0);
            assert_eq!(report.next_day_reminders, 0);
        }

        assert_eq!(reminders(&sink.events().await), vec![("ord-01".to_string(), ymd(2026, 2, 4))]);
    }

    #[tokio::test]
    async fn test_batch_reminds_each_upcoming_delivery_once() {
        let (service, sink, _metrics) = test_service(Arc::new(InMemoryOrderStore::with_orders(vec![
            create_test_order("ord-01", ymd(2026, 2, 2), ymd(2026, 2, 14)),
            create_test_order("ord-02", ymd(2026, 2, 2), ymd(2026, 2, 14)),
        ])));
        let date = ymd(2026, 2, 3);
        service.transition_single_delivery("ord-01", date, DeliveryStatus::Delivered, "admin", at()).await.unwrap();

        let report = service
            .batch_transition_for_date(date, DeliveryStatus::Delivered, "admin", at(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec!["ord-02".to_string()]);
        assert_eq!(report.next_day_reminders, 1);

        let mut sent = reminders(&sink.events().await);
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("ord-01".to_string(), ymd(2026, 2, 4)),
                ("ord-02".to_string(), ymd(2026, 2, 4)),
            ]
        );
    }
}
