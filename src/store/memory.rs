use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::delivery::SubscriptionOrder;
use crate::event_sourcing::core::Aggregate;
use super::order_store::{AppliedTransition, OrderStore, StoreError, TransitionRequest};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Each order sits behind its own mutex. The outer lock is only held long
// enough to find the entry, so writes to different orders run in parallel
// while writes to the same order are serialized.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<BTreeMap<String, Arc<Mutex<SubscriptionOrder>>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = SubscriptionOrder>) -> Self {
        let orders = orders
            .into_iter()
            .map(|order| (order.id.clone(), Arc::new(Mutex::new(order))))
            .collect();

        Self {
            orders: RwLock::new(orders),
        }
    }

    async fn entry(&self, order_id: &str) -> Result<Arc<Mutex<SubscriptionOrder>>, StoreError> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn fetch_all_orders(&self) -> Result<Vec<SubscriptionOrder>, StoreError> {
        let entries: Vec<Arc<Mutex<SubscriptionOrder>>> =
            self.orders.read().await.values().cloned().collect();

        let mut orders = Vec::with_capacity(entries.len());
        for entry in entries {
            orders.push(entry.lock().await.clone());
        }

        Ok(orders)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<SubscriptionOrder, StoreError> {
        let entry = self.entry(order_id).await?;
        let order = entry.lock().await.clone();
        Ok(order)
    }

    async fn apply_transition(&self, request: &TransitionRequest) -> Result<AppliedTransition, StoreError> {
        let entry = self.entry(&request.order_id).await?;
        let mut order = entry.lock().await;

        let events = order.execute(&request.command())?;

        tracing::debug!(
            order_id = %request.order_id,
            date = %request.date,
            target = %request.target,
            changed = !events.is_empty(),
            version = order.version(),
            "Applied delivery transition"
        );

        Ok(AppliedTransition {
            order: order.clone(),
            events,
        })
    }

    async fn insert_order(&self, order: SubscriptionOrder) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }

        orders.insert(order.id.clone(), Arc::new(Mutex::new(order)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::domain::delivery::aggregate::tests::{create_test_order, ymd};
    use crate::domain::delivery::{DeliveryError, DeliveryStatus};

    fn request(order_id: &str, target: DeliveryStatus) -> TransitionRequest {
        TransitionRequest {
            order_id: order_id.to_string(),
            date: ymd(2026, 2, 3),
            target,
            actor: "admin".to_string(),
            at: Utc.with_ymd_and_hms(2026, 2, 3, 7, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_apply_transition_persists_change() {
        let store = InMemoryOrderStore::with_orders(vec![create_test_order("ord-1", ymd(2026, 2, 2), ymd(2026, 2, 8))]);

        let applied = store.apply_transition(&request("ord-1", DeliveryStatus::OutForDelivery)).await.unwrap();

        assert!(applied.changed());
        assert_eq!(applied.status(ymd(2026, 2, 3)), Some(DeliveryStatus::OutForDelivery));

        let stored = store.fetch_order("ord-1").await.unwrap();
        assert_eq!(stored.delivery_on(ymd(2026, 2, 3)).unwrap().status, DeliveryStatus::OutForDelivery);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let store = InMemoryOrderStore::new();

        let result = store.apply_transition(&request("missing", DeliveryStatus::Delivered)).await;

        assert!(matches!(result.unwrap_err(), StoreError::OrderNotFound(id) if id == "missing"));
        assert!(matches!(store.fetch_order("missing").await, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_guard_rejection_surfaces_as_rejected() {
        let store = InMemoryOrderStore::with_orders(vec![create_test_order("ord-1", ymd(2026, 2, 2), ymd(2026, 2, 8))]);
        store.apply_transition(&request("ord-1", DeliveryStatus::Delivered)).await.unwrap();

        let result = store.apply_transition(&request("ord-1", DeliveryStatus::OutForDelivery)).await;

        assert!(matches!(
            result.unwrap_err(),
            StoreError::Rejected(DeliveryError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_transitions_coalesce() {
        let store = Arc::new(InMemoryOrderStore::with_orders(vec![create_test_order(
            "ord-1",
            ymd(2026, 2, 2),
            ymd(2026, 2, 8),
        )]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.apply_transition(&request("ord-1", DeliveryStatus::Delivered)).await })
            })
            .collect();

        let mut changed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().changed() {
                changed += 1;
            }
        }

        assert_eq!(changed, 1);
        let stored = store.fetch_order("ord-1").await.unwrap();
        assert_eq!(stored.delivery_on(ymd(2026, 2, 3)).unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = InMemoryOrderStore::new();
        let order = create_test_order("ord-1", ymd(2026, 2, 2), ymd(2026, 2, 8));

        store.insert_order(order.clone()).await.unwrap();
        let result = store.insert_order(order).await;

        assert!(matches!(result.unwrap_err(), StoreError::DuplicateOrder(_)));
        assert_eq!(store.fetch_all_orders().await.unwrap().len(), 1);
    }
}
