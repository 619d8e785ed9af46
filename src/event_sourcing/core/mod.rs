// ============================================================================
// Core - Generic Aggregate and Event Abstractions
// ============================================================================
//
// Key Principles:
// - No domain-specific code (no orders, deliveries, customers)
// - Generic over aggregate and event types
//
// ============================================================================

pub mod aggregate;
pub mod event;

// Re-export core types for convenience
pub use aggregate::Aggregate;
pub use event::{DomainEvent, EventEnvelope, UNSEQUENCED};
