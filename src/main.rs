use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use kameo::Actor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use delivery_schedule::config::EngineConfig;
use delivery_schedule::domain::delivery::{DeliveryStatus, NewSubscription, OrderItem};
use delivery_schedule::metrics::{self, Metrics};
use delivery_schedule::notifications::{LoggingDispatcher, NotificationWorker};
use delivery_schedule::service::DeliveryService;
use delivery_schedule::store::InMemoryOrderStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,delivery_schedule=debug"))
        )
        .init();

    tracing::info!("🚀 Starting subscription delivery scheduling demo");

    // === 1. Load configuration ===
    let config_path = std::env::var("DELIVERY_CONFIG").ok().map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref()).await?;
    tracing::info!(
        rest_weekday = %config.rest_weekday,
        batch_concurrency = config.batch_concurrency,
        "Configuration loaded"
    );

    // === 2. Initialize Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // Start metrics HTTP server in background thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Metrics runtime error: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Start the notification worker ===
    let worker = NotificationWorker::new(Arc::new(LoggingDispatcher), config.retry_config(), metrics.clone());
    let worker_ref = NotificationWorker::spawn(worker);

    // === 4. Wire the engine ===
    let store = Arc::new(InMemoryOrderStore::new());
    let service = DeliveryService::new(store, Arc::new(worker_ref.clone()), metrics.clone(), config);

    // === 5. Register a few subscriptions ===
    let today = NaiveDate::from_ymd_opt(2026, 2, 3)
        .ok_or_else(|| anyhow::anyhow!("invalid demo date"))?;
    let placed_at = Utc.with_ymd_and_hms(2026, 1, 28, 10, 0, 0).single()
        .ok_or_else(|| anyhow::anyhow!("invalid demo timestamp"))?;

    let customers = [
        ("ord-1001", "Asha Rao", "Fruit Pack", 0),
        ("ord-1002", "Ben Okafor", "Salad Pack", 0),
        ("ord-1003", "Chen Wei", "Fruit Pack", -1),
        ("ord-1004", "Dana Silva", "Juice Pack", 1),
    ];

    for (id, name, pack, offset_days) in customers {
        let start_date = today + Duration::days(offset_days);
        service
            .register_order(NewSubscription {
                id: id.to_string(),
                customer_name: name.to_string(),
                phone: "555-0100".to_string(),
                email: format!("{}@example.com", id),
                location: "North Campus".to_string(),
                items: vec![OrderItem {
                    name: pack.to_string(),
                    quantity: 1,
                }],
                total_amount: 1499.0,
                placed_at,
                start_date,
                end_date: start_date + Duration::days(27),
            })
            .await?;
    }

    // === 6. Single transition ===
    let now = Utc::now();
    service
        .transition_single_delivery("ord-1001", today, DeliveryStatus::OutForDelivery, "dispatcher", now)
        .await?;

    // Regressions are rejected with a readable reason
    service
        .transition_single_delivery("ord-1003", today, DeliveryStatus::Delivered, "rider-7", now)
        .await?;
    if let Err(e) = service
        .transition_single_delivery("ord-1003", today, DeliveryStatus::Pending, "rider-7", now)
        .await
    {
        tracing::info!(error = %e, "Rejected transition as expected");
    }

    // === 7. Daily batch ===
    let cancel = CancellationToken::new();
    let report = service
        .batch_transition_for_date(today, DeliveryStatus::Delivered, "admin", now, &cancel)
        .await?;
    tracing::info!(
        succeeded = ?report.succeeded,
        failed = report.failed.len(),
        reminders = report.next_day_reminders,
        "Batch report"
    );
    report.ensure_complete()?;

    // === 8. Read-side views ===
    let statistics = service.get_order_statistics("ord-1001").await?;
    tracing::info!(
        delivered = statistics.delivered,
        remaining = statistics.remaining(),
        total = statistics.total_days,
        "ord-1001 progress"
    );

    let calendar = service.get_monthly_calendar(2026, 2).await?;
    for day in calendar.days.iter().filter(|day| day.total_customers > 0).take(7) {
        tracing::info!(
            date = %day.date,
            customers = day.total_customers,
            pending = day.pending,
            out_for_delivery = day.out_for_delivery,
            delivered = day.delivered,
            summary = ?day.summary(),
            "Monthly calendar"
        );
    }

    let upcoming = service.get_next_day_deliveries(today).await?;
    println!("{}", serde_json::to_string_pretty(&upcoming)?);

    // Let the worker drain its mailbox
    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
