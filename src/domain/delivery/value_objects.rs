use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Delivery Value Objects
// ============================================================================

/// Status of a single delivery day.
///
/// `Rest` sits outside the ranked progression and never changes. The other
/// three statuses are ordered `Pending < OutForDelivery < Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Rest,
    Pending,
    OutForDelivery,
    Delivered,
}

impl DeliveryStatus {
    /// Position in the one-way progression, `None` for rest days.
    pub fn rank(self) -> Option<u8> {
        match self {
            DeliveryStatus::Rest => None,
            DeliveryStatus::Pending => Some(0),
            DeliveryStatus::OutForDelivery => Some(1),
            DeliveryStatus::Delivered => Some(2),
        }
    }

    pub fn is_rest(self) -> bool {
        matches!(self, DeliveryStatus::Rest)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Rest => "rest",
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry appended on every real status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub actor: String,
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
    pub at: DateTime<Utc>,
}

/// One calendar date inside a subscription's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDay {
    pub date: NaiveDate,
    pub is_rest_day: bool,
    /// Dense 1-based position among deliverable days; `None` on rest days.
    pub delivery_index: Option<u32>,
    pub status: DeliveryStatus,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
}

impl DeliveryDay {
    pub fn rest(date: NaiveDate) -> Self {
        Self {
            date,
            is_rest_day: true,
            delivery_index: None,
            status: DeliveryStatus::Rest,
            updated_by: None,
            updated_at: None,
            history: Vec::new(),
        }
    }

    pub fn deliverable(date: NaiveDate, delivery_index: u32) -> Self {
        Self {
            date,
            is_rest_day: false,
            delivery_index: Some(delivery_index),
            status: DeliveryStatus::Pending,
            updated_by: None,
            updated_at: None,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
}

/// Where notifications for an order are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Attributes supplied when a subscription is purchased, before its
/// delivery calendar exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub location: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub placed_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranks_are_ordered() {
        assert_eq!(DeliveryStatus::Rest.rank(), None);
        assert!(DeliveryStatus::Pending.rank() < DeliveryStatus::OutForDelivery.rank());
        assert!(DeliveryStatus::OutForDelivery.rank() < DeliveryStatus::Delivered.rank());
    }

    #[test]
    fn test_status_serializes_as_snake_case() {
        let json = serde_json::to_string(&DeliveryStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");

        let status: DeliveryStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_rest_day_has_no_index() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        let day = DeliveryDay::rest(date);

        assert!(day.is_rest_day);
        assert_eq!(day.delivery_index, None);
        assert_eq!(day.status, DeliveryStatus::Rest);
    }

    #[test]
    fn test_deliverable_day_starts_pending() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let day = DeliveryDay::deliverable(date, 1);

        assert!(!day.is_rest_day);
        assert_eq!(day.delivery_index, Some(1));
        assert_eq!(day.status, DeliveryStatus::Pending);
        assert!(day.history.is_empty());
    }
}
