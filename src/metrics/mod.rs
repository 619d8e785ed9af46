// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Delivery status transitions (by target status)
// - Rejected or failed transitions (by reason)
// - Batch runs (outcome, duration)
// - Notification delivery
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Transition Metrics
    pub transitions_total: IntCounterVec,
    pub transition_failures: IntCounterVec,

    // Batch Metrics
    pub batch_runs: IntCounterVec,
    pub batch_orders: IntCounterVec,
    pub batch_duration: HistogramVec,

    // Notification Metrics
    pub notifications_sent: IntCounterVec,
    pub notifications_failed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Transition Metrics
        let transitions_total = IntCounterVec::new(
            Opts::new("delivery_transitions_total", "Delivery status changes applied"),
            &["to_status", "path"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        let transition_failures = IntCounterVec::new(
            Opts::new("delivery_transition_failures_total", "Delivery transitions that were rejected or failed"),
            &["reason", "path"],
        )?;
        registry.register(Box::new(transition_failures.clone()))?;

        // Batch Metrics
        let batch_runs = IntCounterVec::new(
            Opts::new("delivery_batch_runs_total", "Batch transition runs by outcome"),
            &["target", "outcome"],
        )?;
        registry.register(Box::new(batch_runs.clone()))?;

        let batch_orders = IntCounterVec::new(
            Opts::new("delivery_batch_orders_total", "Orders processed by batch runs"),
            &["result"],
        )?;
        registry.register(Box::new(batch_orders.clone()))?;

        let batch_duration = HistogramVec::new(
            HistogramOpts::new("delivery_batch_duration_seconds", "Batch transition run duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["target"],
        )?;
        registry.register(Box::new(batch_duration.clone()))?;

        // Notification Metrics
        let notifications_sent = IntCounterVec::new(
            Opts::new("delivery_notifications_sent_total", "Notifications handed to the dispatcher"),
            &["kind"],
        )?;
        registry.register(Box::new(notifications_sent.clone()))?;

        let notifications_failed = IntCounterVec::new(
            Opts::new("delivery_notifications_failed_total", "Notifications that failed after all retries"),
            &["kind"],
        )?;
        registry.register(Box::new(notifications_failed.clone()))?;

        Ok(Self {
            registry,
            transitions_total,
            transition_failures,
            batch_runs,
            batch_orders,
            batch_duration,
            notifications_sent,
            notifications_failed,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, to_status: &str, path: &str) {
        self.transitions_total.with_label_values(&[to_status, path]).inc();
    }

    pub fn record_transition_failure(&self, reason: &str, path: &str) {
        self.transition_failures.with_label_values(&[reason, path]).inc();
    }

    pub fn record_batch(&self, target: &str, succeeded: usize, failed: usize, cancelled: bool, duration_secs: f64) {
        let outcome = if cancelled {
            "cancelled"
        } else if failed > 0 {
            "partial"
        } else {
            "complete"
        };

        self.batch_runs.with_label_values(&[target, outcome]).inc();
        self.batch_orders.with_label_values(&["succeeded"]).inc_by(succeeded as u64);
        self.batch_orders.with_label_values(&["failed"]).inc_by(failed as u64);
        self.batch_duration.with_label_values(&[target]).observe(duration_secs);
    }

    pub fn record_notification(&self, kind: &str, success: bool) {
        if success {
            self.notifications_sent.with_label_values(&[kind]).inc();
        } else {
            self.notifications_failed.with_label_values(&[kind]).inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("delivered", "single");
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_transition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("delivered", "batch");
        metrics.record_transition("delivered", "batch");

        let gathered = metrics.registry.gather();
        let transitions = gathered.iter().find(|m| m.name() == "delivery_transitions_total").unwrap();
        assert_eq!(transitions.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_batch_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_batch("delivered", 7, 0, false, 0.02);
        metrics.record_batch("delivered", 4, 3, false, 0.03);

        let gathered = metrics.registry.gather();
        let runs = gathered.iter().find(|m| m.name() == "delivery_batch_runs_total").unwrap();
        assert_eq!(runs.metric.len(), 2); // complete and partial
    }

    #[test]
    fn test_record_notification() {
        let metrics = Metrics::new().unwrap();
        metrics.record_notification("delivered", true);
        metrics.record_notification("next_day_reminder", false);

        let gathered = metrics.registry.gather();
        let failed = gathered.iter().find(|m| m.name() == "delivery_notifications_failed_total").unwrap();
        assert_eq!(failed.metric[0].counter.value, Some(1.0));
    }
}
