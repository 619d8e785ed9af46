// ============================================================================
// Delivery Domain - Subscription delivery scheduling
// ============================================================================
//
// This module contains ALL delivery-specific code:
// - Value objects (DeliveryStatus, DeliveryDay, OrderItem)
// - Calendar generation for a subscription's date range
// - Commands and events of the transition engine
// - Errors (DeliveryError enum)
// - Aggregate (SubscriptionOrder with the transition guard)
// - Read-side derivations: statistics, monthly calendar, next-day lookahead
//
// ============================================================================

pub mod value_objects;
pub mod calendar;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod statistics;
pub mod monthly;
pub mod lookahead;

// Re-export for convenience
pub use value_objects::*;
pub use calendar::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use statistics::*;
pub use monthly::*;
pub use lookahead::*;
