use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::aggregate::SubscriptionOrder;
use super::errors::DeliveryError;
use super::value_objects::{DeliveryDay, DeliveryStatus};

// ============================================================================
// Monthly Calendar - rollup across every subscription
// ============================================================================
//
// For each date of a month: how many customers are scheduled, how far their
// deliveries have progressed, and who they are. The builder only asks
// "which records fall on this date", which is what `ScheduleIndex` answers.
// `OrderScan` scans all orders per date; `DateIndex` precomputes a
// date-keyed map. Both give identical output.
//
// ============================================================================

/// One order's record on a given date.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledDelivery<'a> {
    pub order: &'a SubscriptionOrder,
    pub day: &'a DeliveryDay,
}

/// Lookup of the delivery records that fall on a date.
pub trait ScheduleIndex {
    fn scheduled_on(&self, date: NaiveDate) -> Vec<ScheduledDelivery<'_>>;
}

/// Linear scan over every order for each requested date.
pub struct OrderScan<'a> {
    orders: &'a [SubscriptionOrder],
}

impl<'a> OrderScan<'a> {
    pub fn new(orders: &'a [SubscriptionOrder]) -> Self {
        Self { orders }
    }
}

impl ScheduleIndex for OrderScan<'_> {
    fn scheduled_on(&self, date: NaiveDate) -> Vec<ScheduledDelivery<'_>> {
        self.orders
            .iter()
            .filter_map(|order| {
                order
                    .delivery_on(date)
                    .map(|day| ScheduledDelivery { order, day })
            })
            .collect()
    }
}

/// Date-keyed index built once over a window of dates.
pub struct DateIndex<'a> {
    by_date: BTreeMap<NaiveDate, Vec<ScheduledDelivery<'a>>>,
}

impl<'a> DateIndex<'a> {
    /// Index every record of every order.
    pub fn build(orders: &'a [SubscriptionOrder]) -> Self {
        Self::build_filtered(orders, |_| true)
    }

    /// Index only records dated within `[from, to]`.
    pub fn for_range(orders: &'a [SubscriptionOrder], from: NaiveDate, to: NaiveDate) -> Self {
        Self::build_filtered(orders, |date| from <= date && date <= to)
    }

    fn build_filtered(orders: &'a [SubscriptionOrder], keep: impl Fn(NaiveDate) -> bool) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<ScheduledDelivery<'a>>> = BTreeMap::new();

        for order in orders {
            for day in order.deliveries.iter().filter(|day| keep(day.date)) {
                by_date
                    .entry(day.date)
                    .or_default()
                    .push(ScheduledDelivery { order, day });
            }
        }

        Self { by_date }
    }

    pub fn dates(&self) -> usize {
        self.by_date.len()
    }
}

impl ScheduleIndex for DateIndex<'_> {
    fn scheduled_on(&self, date: NaiveDate) -> Vec<ScheduledDelivery<'_>> {
        self.by_date.get(&date).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub order_id: String,
    pub customer_name: String,
    pub pack_name: String,
    pub status: DeliveryStatus,
}

/// State the presentation layer uses to style a day cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySummary {
    /// Nobody scheduled (rest day or outside every range).
    Empty,
    /// Nothing has left yet.
    Pending,
    /// Some deliveries started or finished, not all done.
    InProgress,
    FullyDelivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCalendarDay {
    pub date: NaiveDate,
    pub total_customers: u32,
    pub pending: u32,
    pub out_for_delivery: u32,
    pub delivered: u32,
    pub entries: Vec<CalendarEntry>,
}

impl MonthlyCalendarDay {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_customers: 0,
            pending: 0,
            out_for_delivery: 0,
            delivered: 0,
            entries: Vec::new(),
        }
    }

    pub fn is_fully_delivered(&self) -> bool {
        self.total_customers > 0 && self.delivered == self.total_customers
    }

    pub fn summary(&self) -> DaySummary {
        if self.total_customers == 0 {
            DaySummary::Empty
        } else if self.is_fully_delivered() {
            DaySummary::FullyDelivered
        } else if self.pending == self.total_customers {
            DaySummary::Pending
        } else {
            DaySummary::InProgress
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCalendar {
    pub year: i32,
    pub month: u32,
    pub days: Vec<MonthlyCalendarDay>,
}

impl MonthlyCalendar {
    pub fn day(&self, date: NaiveDate) -> Option<&MonthlyCalendarDay> {
        self.days.iter().find(|day| day.date == date)
    }
}

/// First and last date of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DeliveryError> {
    let invalid = || DeliveryError::InvalidMonth { year, month };

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_month_first
        .and_then(|date| date.pred_opt())
        .ok_or_else(invalid)?;

    Ok((first, last))
}

/// Aggregate every date of `year`-`month` from the given index.
pub fn build_monthly_calendar<I: ScheduleIndex>(
    index: &I,
    year: i32,
    month: u32,
) -> Result<MonthlyCalendar, DeliveryError> {
    let (first, last) = month_bounds(year, month)?;

    let days: Vec<MonthlyCalendarDay> = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| build_day(index, date))
        .collect();

    tracing::debug!(
        year = year,
        month = month,
        days = days.len(),
        scheduled_days = days.iter().filter(|d| d.total_customers > 0).count(),
        "Built monthly delivery calendar"
    );

    Ok(MonthlyCalendar { year, month, days })
}

fn build_day<I: ScheduleIndex>(index: &I, date: NaiveDate) -> MonthlyCalendarDay {
    let mut day = MonthlyCalendarDay::empty(date);

    for scheduled in index.scheduled_on(date) {
        match scheduled.day.status {
            DeliveryStatus::Rest => continue,
            DeliveryStatus::Pending => day.pending += 1,
            DeliveryStatus::OutForDelivery => day.out_for_delivery += 1,
            DeliveryStatus::Delivered => day.delivered += 1,
        }
        day.total_customers += 1;
        day.entries.push(CalendarEntry {
            order_id: scheduled.order.id.clone(),
            customer_name: scheduled.order.customer_name.clone(),
            pack_name: scheduled.order.pack_name(),
            status: scheduled.day.status,
        });
    }

    day
}
