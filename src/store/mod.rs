// ============================================================================
// Order Store - Persistence boundary
// ============================================================================
//
// The store is the single owner of mutable order state. The engine reads
// through `fetch_*` and writes only through `apply_transition`, which must be
// atomic per (order, date) pair.
//
// ============================================================================

pub mod order_store;
pub mod memory;

pub use order_store::{AppliedTransition, OrderStore, StoreError, TransitionRequest};
pub use memory::InMemoryOrderStore;
