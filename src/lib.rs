// ============================================================================
// Subscription delivery scheduling engine
// ============================================================================
//
// - domain:         calendar generation, transition guard, read-side views
// - event_sourcing: aggregate/event abstractions and the event sink
// - store:          order persistence boundary and the in-memory store
// - service:        single and batch transitions, monthly view, lookahead
// - notifications:  actor that turns delivery events into customer messages
// - metrics:        Prometheus registry and HTTP exporter
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod notifications;
pub mod service;
pub mod store;
pub mod utils;
