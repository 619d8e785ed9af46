// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure scheduling and state-machine logic. Nothing here performs I/O or
// reads the clock; dates and timestamps are always passed in.
//
// ============================================================================

pub mod delivery;
