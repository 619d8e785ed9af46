use serde::{Deserialize, Serialize};

use super::aggregate::SubscriptionOrder;
use super::value_objects::{DeliveryDay, DeliveryStatus};

/// Per-order counts, always recomputed from the delivery days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_days: u32,
    pub pending: u32,
    pub out_for_delivery: u32,
    pub delivered: u32,
}

impl OrderStatistics {
    pub fn from_deliveries(deliveries: &[DeliveryDay]) -> Self {
        deliveries.iter().fold(Self::default(), |mut stats, day| {
            match day.status {
                DeliveryStatus::Rest => return stats,
                DeliveryStatus::Pending => stats.pending += 1,
                DeliveryStatus::OutForDelivery => stats.out_for_delivery += 1,
                DeliveryStatus::Delivered => stats.delivered += 1,
            }
            stats.total_days += 1;
            stats
        })
    }

    pub fn remaining(&self) -> u32 {
        self.total_days.saturating_sub(self.delivered)
    }

    pub fn is_complete(&self) -> bool {
        self.total_days > 0 && self.delivered == self.total_days
    }
}

impl SubscriptionOrder {
    pub fn statistics(&self) -> OrderStatistics {
        OrderStatistics::from_deliveries(&self.deliveries)
    }
}
