use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::aggregate::SubscriptionOrder;
use super::events::NextDeliveryDue;
use super::value_objects::{CustomerContact, DeliveryDay, DeliveryStatus};

// ============================================================================
// Next-Day Lookahead
// ============================================================================
//
// "Tomorrow" is always derived from a date the caller passes in. Nothing in
// here reads the wall clock.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingDelivery {
    pub order_id: String,
    pub customer: CustomerContact,
    pub location: String,
    pub pack_name: String,
    pub date: NaiveDate,
    pub delivery_index: u32,
    pub status: DeliveryStatus,
    pub delivered_so_far: u32,
    pub total_days: u32,
}

impl UpcomingDelivery {
    fn new(order: &SubscriptionOrder, day: &DeliveryDay, delivery_index: u32) -> Self {
        let stats = order.statistics();

        Self {
            order_id: order.id.clone(),
            customer: order.contact(),
            location: order.location.clone(),
            pack_name: order.pack_name(),
            date: day.date,
            delivery_index,
            status: day.status,
            delivered_so_far: stats.delivered,
            total_days: stats.total_days,
        }
    }

    pub fn to_event(&self) -> NextDeliveryDue {
        NextDeliveryDue {
            order_id: self.order_id.clone(),
            customer: self.customer.clone(),
            date: self.date,
            delivery_index: self.delivery_index,
            delivered_so_far: self.delivered_so_far,
            total_days: self.total_days,
        }
    }
}

fn awaiting_delivery(day: &DeliveryDay) -> Option<u32> {
    match day.status {
        DeliveryStatus::Pending | DeliveryStatus::OutForDelivery => day.delivery_index,
        DeliveryStatus::Rest | DeliveryStatus::Delivered => None,
    }
}

/// Orders with a deliverable, not yet delivered day on the day after
/// `reference_date`, by delivery index then order id.
pub fn next_day_deliveries<'a, I>(orders: I, reference_date: NaiveDate) -> Vec<UpcomingDelivery>
where
    I: IntoIterator<Item = &'a SubscriptionOrder>,
{
    let Some(tomorrow) = reference_date.succ_opt() else {
        return Vec::new();
    };

    let mut upcoming: Vec<UpcomingDelivery> = orders
        .into_iter()
        .filter_map(|order| {
            let day = order.delivery_on(tomorrow)?;
            let index = awaiting_delivery(day)?;
            Some(UpcomingDelivery::new(order, day, index))
        })
        .collect();

    upcoming.sort_by(|a, b| {
        a.delivery_index
            .cmp(&b.delivery_index)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });

    tracing::debug!(
        reference_date = %reference_date,
        tomorrow = %tomorrow,
        count = upcoming.len(),
        "Computed next-day deliveries"
    );

    upcoming
}

/// The first deliverable day strictly after `date` that is still awaiting
/// delivery for this order.
pub fn next_delivery_after(order: &SubscriptionOrder, date: NaiveDate) -> Option<UpcomingDelivery> {
    order
        .deliveries
        .iter()
        .filter(|day| day.date > date)
        .find_map(|day| awaiting_delivery(day).map(|index| UpcomingDelivery::new(order, day, index)))
}
