use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::delivery::{DeliveryCommand, DeliveryError, DeliveryEvent, DeliveryStatus, SubscriptionOrder};

// ============================================================================
// Store Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    /// The domain guard refused the write.
    #[error(transparent)]
    Rejected(#[from] DeliveryError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DeliveryError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::OrderNotFound(order_id) => DeliveryError::OrderNotFound(order_id),
            StoreError::Rejected(inner) => inner,
            StoreError::DuplicateOrder(order_id) => {
                DeliveryError::StoreUnavailable(format!("duplicate order {}", order_id))
            }
            StoreError::Unavailable(reason) => DeliveryError::StoreUnavailable(reason),
        }
    }
}

// ============================================================================
// Transition Request / Result
// ============================================================================

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub order_id: String,
    pub date: NaiveDate,
    pub target: DeliveryStatus,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl TransitionRequest {
    pub fn command(&self) -> DeliveryCommand {
        DeliveryCommand::TransitionDelivery {
            date: self.date,
            target: self.target,
            actor: self.actor.clone(),
            at: self.at,
        }
    }
}

/// What the store applied, computed while it held the record exclusively.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    /// The order as it stands after the write.
    pub order: SubscriptionOrder,
    /// Empty when the record was already at the target status.
    pub events: Vec<DeliveryEvent>,
}

impl AppliedTransition {
    pub fn changed(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn status(&self, date: NaiveDate) -> Option<DeliveryStatus> {
        self.order.delivery_on(date).map(|day| day.status)
    }
}

// ============================================================================
// Order Store Trait
// ============================================================================

/// Persistence consumed by the delivery engine.
///
/// `apply_transition` must run the aggregate's `execute` for the request
/// while holding the (order, date) record exclusively, so that two
/// concurrent identical transitions coalesce into one change and a stale
/// one is rejected by the guard rather than overwriting newer state.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn fetch_all_orders(&self) -> Result<Vec<SubscriptionOrder>, StoreError>;

    async fn fetch_order(&self, order_id: &str) -> Result<SubscriptionOrder, StoreError>;

    async fn apply_transition(&self, request: &TransitionRequest) -> Result<AppliedTransition, StoreError>;

    /// Persist a freshly created order with its generated calendar.
    async fn insert_order(&self, order: SubscriptionOrder) -> Result<(), StoreError>;
}
