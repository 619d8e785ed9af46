use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::delivery::{CustomerContact, DeliveryEvent, DeliveryStatus};

// ============================================================================
// Notification Kinds and Payload
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OutForDelivery,
    Delivered,
    NextDayReminder,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::OutForDelivery => "out_for_delivery",
            NotificationKind::Delivered => "delivered",
            NotificationKind::NextDayReminder => "next_day_reminder",
        }
    }

    /// Which template an event maps to, if any.
    pub fn for_event(event: &DeliveryEvent) -> Option<Self> {
        match event {
            DeliveryEvent::StatusChanged(e) => match e.to {
                DeliveryStatus::OutForDelivery => Some(NotificationKind::OutForDelivery),
                DeliveryStatus::Delivered => Some(NotificationKind::Delivered),
                DeliveryStatus::Pending | DeliveryStatus::Rest => None,
            },
            DeliveryEvent::NextDeliveryDue(_) => Some(NotificationKind::NextDayReminder),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub order_id: String,
    pub date: NaiveDate,
    pub message: String,
    pub delivery_index: Option<u32>,
    pub delivered_so_far: Option<u32>,
    pub total_days: Option<u32>,
}

impl NotificationPayload {
    pub fn from_event(event: &DeliveryEvent) -> Self {
        match event {
            DeliveryEvent::StatusChanged(e) => {
                let what = match e.to {
                    DeliveryStatus::OutForDelivery => "is out for delivery",
                    DeliveryStatus::Delivered => "has been delivered",
                    DeliveryStatus::Pending | DeliveryStatus::Rest => "was updated",
                };

                Self {
                    order_id: e.order_id.clone(),
                    date: e.date,
                    message: format!("Hi {}, your pack for {} {}.", e.customer.name, e.date, what),
                    delivery_index: e.delivery_index,
                    delivered_so_far: None,
                    total_days: None,
                }
            }
            DeliveryEvent::NextDeliveryDue(e) => Self {
                order_id: e.order_id.clone(),
                date: e.date,
                message: format!(
                    "Hi {}, delivery {} of {} is scheduled for {}.",
                    e.customer.name, e.delivery_index, e.total_days, e.date
                ),
                delivery_index: Some(e.delivery_index),
                delivered_so_far: Some(e.delivered_so_far),
                total_days: Some(e.total_days),
            },
        }
    }
}

// ============================================================================
// Dispatcher Boundary
// ============================================================================

/// Delivery channel for customer notifications (email, SMS).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        contact: &CustomerContact,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of sending them.
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify(
        &self,
        contact: &CustomerContact,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()> {
        tracing::info!(
            kind = %kind,
            order_id = %payload.order_id,
            email = %contact.email,
            phone = %contact.phone,
            "📨 {}",
            payload.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::domain::delivery::{DeliveryStatusChanged, NextDeliveryDue};

    fn contact() -> CustomerContact {
        CustomerContact {
            name: "Asha".to_string(),
            phone: "555-0100".to_string(),
            email: "asha@example.com".to_string(),
        }
    }

    fn status_changed(to: DeliveryStatus) -> DeliveryEvent {
        DeliveryEvent::StatusChanged(DeliveryStatusChanged {
            order_id: "ord-1".to_string(),
            customer: contact(),
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            delivery_index: Some(2),
            from: DeliveryStatus::Pending,
            to,
            actor: "admin".to_string(),
            changed_at: Utc.with_ymd_and_hms(2026, 2, 3, 8, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_kind_for_status_changes() {
        assert_eq!(
            NotificationKind::for_event(&status_changed(DeliveryStatus::OutForDelivery)),
            Some(NotificationKind::OutForDelivery)
        );
        assert_eq!(
            NotificationKind::for_event(&status_changed(DeliveryStatus::Delivered)),
            Some(NotificationKind::Delivered)
        );
    }

    #[test]
    fn test_reminder_payload() {
        let event = DeliveryEvent::NextDeliveryDue(NextDeliveryDue {
            order_id: "ord-1".to_string(),
            customer: contact(),
            date: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            delivery_index: 3,
            delivered_so_far: 2,
            total_days: 24,
        });

        let payload = NotificationPayload::from_event(&event);

        assert_eq!(NotificationKind::for_event(&event), Some(NotificationKind::NextDayReminder));
        assert_eq!(payload.message, "Hi Asha, delivery 3 of 24 is scheduled for 2026-02-04.");
        assert_eq!(payload.delivered_so_far, Some(2));
    }

    #[test]
    fn test_delivered_payload_message() {
        let payload = NotificationPayload::from_event(&status_changed(DeliveryStatus::Delivered));

        assert_eq!(payload.message, "Hi Asha, your pack for 2026-02-03 has been delivered.");
        assert_eq!(payload.delivery_index, Some(2));
    }
}
