use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use geti_events::EventBus;
use geti_worker::{EventConsumer, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geti_worker=debug,geti_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;
    tracing::info!(
        db_max_connections = config.db_max_connections,
        event_bus_capacity = config.event_bus_capacity,
        counter_update_retries = config.counter_update_retries,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = geti_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    geti_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    geti_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Event bus and consumer ---
    let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));
    let cancel = CancellationToken::new();
    let consumer = EventConsumer::new(pool.clone(), config.counter_update_retries);
    let consumer_handle = tokio::spawn(consumer.run(event_bus.subscribe(), cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    tracing::info!("Shutdown requested");

    cancel.cancel();
    drop(event_bus);
    match tokio::time::timeout(Duration::from_secs(5), consumer_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Event consumer task failed"),
        Err(_) => tracing::warn!("Event consumer did not stop within 5s"),
    }
    pool.close().await;

    tracing::info!("Worker stopped");
    Ok(())
}
