// ============================================================================
// Notifications
// ============================================================================
//
// Turns delivery events into customer notifications:
// - dispatcher/ - the channel boundary (email/SMS live behind it)
// - worker/     - kameo actor consuming events asynchronously
//
// ============================================================================

mod dispatcher;
mod worker;

pub use dispatcher::{LoggingDispatcher, NotificationDispatcher, NotificationKind, NotificationPayload};
pub use worker::{DispatchEvent, NotificationWorker};
