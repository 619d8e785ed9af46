use chrono::{Datelike, NaiveDate, Weekday};

use super::errors::DeliveryError;
use super::value_objects::DeliveryDay;

// ============================================================================
// Calendar Generator
// ============================================================================
//
// Expands a subscription's [start, end] range into one record per date.
// Dates falling on the rest weekday become `rest` records; every other date
// is `pending` and receives the next delivery index. The counter skips rest
// days, so indices are dense 1..N over deliverable days only.
//
// ============================================================================

/// Weekday on which no deliveries happen unless configured otherwise.
pub const DEFAULT_REST_WEEKDAY: Weekday = Weekday::Sun;

/// Build the delivery calendar for an inclusive date range.
pub fn generate_calendar(
    start: NaiveDate,
    end: NaiveDate,
    rest_weekday: Weekday,
) -> Result<Vec<DeliveryDay>, DeliveryError> {
    if end < start {
        return Err(DeliveryError::InvalidRange { start, end });
    }

    let mut days = Vec::with_capacity(range_len(start, end));
    let mut next_index = 1;

    for date in start.iter_days().take_while(|date| *date <= end) {
        if date.weekday() == rest_weekday {
            days.push(DeliveryDay::rest(date));
        } else {
            days.push(DeliveryDay::deliverable(date, next_index));
            next_index += 1;
        }
    }

    tracing::debug!(
        start = %start,
        end = %end,
        days = days.len(),
        deliverable_days = next_index - 1,
        "Generated delivery calendar"
    );

    Ok(days)
}

fn range_len(start: NaiveDate, end: NaiveDate) -> usize {
    usize::try_from((end - start).num_days() + 1).unwrap_or(0)
}
