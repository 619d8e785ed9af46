use chrono::{DateTime, NaiveDate, Utc};

use super::value_objects::DeliveryStatus;

// ============================================================================
// Delivery Commands - Represent operator intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum DeliveryCommand {
    /// Move one delivery day of an order towards `target`.
    TransitionDelivery {
        date: NaiveDate,
        target: DeliveryStatus,
        actor: String,
        at: DateTime<Utc>,
    },
}
