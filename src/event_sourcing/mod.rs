// ============================================================================
// Event Infrastructure
// ============================================================================
//
// Generic aggregate/event abstractions and the sink events are published to.
// Domain-specific code is in src/domain/
//
// ============================================================================

// Core abstractions (GENERIC - works with any aggregate)
pub mod core;
mod sink;

pub use self::core::*;
pub use sink::EventSink;
#[cfg(test)]
pub(crate) use sink::RecordingSink;
