use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{CustomerContact, DeliveryStatus};

// ============================================================================
// Delivery Events - Emitted after a transition is applied
// ============================================================================
//
// The transition engine never talks to notification channels. It emits these
// events and the notification worker turns them into messages.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeliveryEvent {
    StatusChanged(DeliveryStatusChanged),
    NextDeliveryDue(NextDeliveryDue),
}

impl DeliveryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryEvent::StatusChanged(_) => "DeliveryStatusChanged",
            DeliveryEvent::NextDeliveryDue(_) => "NextDeliveryDue",
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            DeliveryEvent::StatusChanged(e) => &e.order_id,
            DeliveryEvent::NextDeliveryDue(e) => &e.order_id,
        }
    }

    pub fn customer(&self) -> &CustomerContact {
        match self {
            DeliveryEvent::StatusChanged(e) => &e.customer,
            DeliveryEvent::NextDeliveryDue(e) => &e.customer,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            DeliveryEvent::StatusChanged(e) => e.date,
            DeliveryEvent::NextDeliveryDue(e) => e.date,
        }
    }
}

impl DomainEvent for DeliveryEvent {
    fn event_type() -> &'static str { "DeliveryEvent" }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// A delivery day moved forward in the status progression
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeliveryStatusChanged {
    pub order_id: String,
    pub customer: CustomerContact,
    pub date: NaiveDate,
    pub delivery_index: Option<u32>,
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

impl DomainEvent for DeliveryStatusChanged {
    fn event_type() -> &'static str { "DeliveryStatusChanged" }
}

/// An order has a deliverable day coming up that still needs delivering
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NextDeliveryDue {
    pub order_id: String,
    pub customer: CustomerContact,
    pub date: NaiveDate,
    pub delivery_index: u32,
    pub delivered_so_far: u32,
    pub total_days: u32,
}

impl DomainEvent for NextDeliveryDue {
    fn event_type() -> &'static str { "NextDeliveryDue" }
}
