use chrono::NaiveDate;

use super::value_objects::DeliveryStatus;

// ============================================================================
// Delivery Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid calendar month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Cannot move delivery on {date} from {from} to {to}: {}", rejection_reason(.from, .to))]
    InvalidTransition {
        date: NaiveDate,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("Batch target must be out_for_delivery or delivered, got {0}")]
    InvalidBatchTarget(DeliveryStatus),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} has no delivery scheduled on {date}")]
    DeliveryNotFound { order_id: String, date: NaiveDate },

    #[error("Batch for {date} finished with {failed} failed and {succeeded} succeeded orders")]
    PartialBatchFailure {
        date: NaiveDate,
        succeeded: usize,
        failed: usize,
    },

    #[error("Order store unavailable: {0}")]
    StoreUnavailable(String),
}

impl DeliveryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeliveryError::OrderNotFound(_) | DeliveryError::DeliveryNotFound { .. }
        )
    }

    /// Short machine-friendly label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::InvalidRange { .. } | DeliveryError::InvalidMonth { .. } => "invalid_range",
            DeliveryError::InvalidTransition { .. } | DeliveryError::InvalidBatchTarget(_) => {
                "invalid_transition"
            }
            DeliveryError::OrderNotFound(_) | DeliveryError::DeliveryNotFound { .. } => "not_found",
            DeliveryError::PartialBatchFailure { .. } => "partial_batch_failure",
            DeliveryError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

fn rejection_reason(from: &DeliveryStatus, to: &DeliveryStatus) -> &'static str {
    if from.is_rest() || to.is_rest() {
        "rest days never change status"
    } else if *from == DeliveryStatus::Delivered {
        "already delivered, cannot revert"
    } else {
        "status cannot move backwards"
    }
}
