use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::Aggregate;
use super::calendar::generate_calendar;
use super::commands::DeliveryCommand;
use super::errors::DeliveryError;
use super::events::{DeliveryEvent, DeliveryStatusChanged};
use super::value_objects::{
    CustomerContact, DeliveryDay, DeliveryStatus, NewSubscription, OrderItem, TransitionRecord,
};

// ============================================================================
// Subscription Order Aggregate - Status Transition Engine
// ============================================================================
//
// Every status change, whether requested for a single order or as part of a
// daily batch, goes through `check_transition`. There is no other place that
// compares statuses.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionOrder {
    // Identity
    pub id: String,
    pub version: i64,

    // Customer
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub location: String,

    // Purchase
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub placed_at: chrono::DateTime<chrono::Utc>,

    // Schedule
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deliveries: Vec<DeliveryDay>,
}

/// Outcome of the transition guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Target equals current status; nothing to record.
    Unchanged,
    /// Target ranks above current status.
    Advance,
}

/// The single guard shared by the single-order path, batch eligibility and
/// the store's atomic apply.
pub fn check_transition(
    date: NaiveDate,
    from: DeliveryStatus,
    to: DeliveryStatus,
) -> Result<TransitionKind, DeliveryError> {
    let rejected = DeliveryError::InvalidTransition { date, from, to };

    match (from.rank(), to.rank()) {
        (Some(current), Some(target)) if target == current => Ok(TransitionKind::Unchanged),
        (Some(current), Some(target)) if target > current => Ok(TransitionKind::Advance),
        _ => Err(rejected),
    }
}

/// A record is batch-eligible when the guard would actually advance it.
pub fn is_eligible(day: &DeliveryDay, target: DeliveryStatus) -> bool {
    matches!(
        check_transition(day.date, day.status, target),
        Ok(TransitionKind::Advance)
    )
}

impl SubscriptionOrder {
    /// Create the order and generate its delivery calendar. The calendar is
    /// produced once here and never regenerated.
    pub fn create(draft: NewSubscription, rest_weekday: Weekday) -> Result<Self, DeliveryError> {
        let deliveries = generate_calendar(draft.start_date, draft.end_date, rest_weekday)?;

        Ok(Self {
            id: draft.id,
            version: 0,
            customer_name: draft.customer_name,
            phone: draft.phone,
            email: draft.email,
            location: draft.location,
            items: draft.items,
            total_amount: draft.total_amount,
            placed_at: draft.placed_at,
            start_date: draft.start_date,
            end_date: draft.end_date,
            deliveries,
        })
    }

    pub fn contact(&self) -> CustomerContact {
        CustomerContact {
            name: self.customer_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }

    /// Display name of the subscribed pack.
    pub fn pack_name(&self) -> String {
        self.items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn delivery_on(&self, date: NaiveDate) -> Option<&DeliveryDay> {
        self.day_position(date).map(|position| &self.deliveries[position])
    }

    fn delivery_on_mut(&mut self, date: NaiveDate) -> Option<&mut DeliveryDay> {
        self.day_position(date).map(move |position| &mut self.deliveries[position])
    }

    // Records are one per date starting at `start_date`, so the offset is
    // the position. Fall back to a search if that ever stops holding.
    fn day_position(&self, date: NaiveDate) -> Option<usize> {
        if !self.covers(date) {
            return None;
        }

        let offset = usize::try_from((date - self.start_date).num_days()).ok()?;
        match self.deliveries.get(offset) {
            Some(day) if day.date == date => Some(offset),
            _ => self.deliveries.iter().position(|day| day.date == date),
        }
    }

    fn not_found(&self, date: NaiveDate) -> DeliveryError {
        DeliveryError::DeliveryNotFound {
            order_id: self.id.clone(),
            date,
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for SubscriptionOrder {
    type Event = DeliveryEvent;
    type Command = DeliveryCommand;
    type Error = DeliveryError;

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryCommand::TransitionDelivery { date, target, actor, at } => {
                let day = self.delivery_on(*date).ok_or_else(|| self.not_found(*date))?;

                match check_transition(*date, day.status, *target)? {
                    TransitionKind::Unchanged => Ok(vec![]),
                    TransitionKind::Advance => {
                        Ok(vec![DeliveryEvent::StatusChanged(DeliveryStatusChanged {
                            order_id: self.id.clone(),
                            customer: self.contact(),
                            date: *date,
                            delivery_index: day.delivery_index,
                            from: day.status,
                            to: *target,
                            actor: actor.clone(),
                            changed_at: *at,
                        })])
                    }
                }
            }
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            DeliveryEvent::StatusChanged(e) => {
                let not_found = self.not_found(e.date);
                let day = self.delivery_on_mut(e.date).ok_or(not_found)?;

                day.status = e.to;
                day.updated_by = Some(e.actor.clone());
                day.updated_at = Some(e.changed_at);
                day.history.push(TransitionRecord {
                    actor: e.actor.clone(),
                    from: e.from,
                    to: e.to,
                    at: e.changed_at,
                });

                self.version += 1;
                Ok(())
            }
            // Reminders carry no state
            DeliveryEvent::NextDeliveryDue(_) => Ok(()),
        }
    }

    fn aggregate_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
