use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use targetping_api::app::{create_app, AppState};
use targetping_api::config::Config;
use targetping_api::jobs::{CleanupLogsJob, JobScheduler, PoolMetricsJob, RefreshTargetsJob};
use targetping_api::middleware::{init_metrics, logging::init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;

    init_logging(&config.logging).context("failed to initialize logging")?;
    init_metrics().context("failed to install metrics recorder")?;

    info!("Starting TargetPing v{}", env!("CARGO_PKG_VERSION"));

    let db_config = persistence::db::DatabaseConfig::from(&config.database);
    let pool = persistence::db::create_pool(&db_config)
        .await
        .context("failed to connect to database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    info!("Migrations completed");

    let addr = config
        .socket_addr()
        .context("invalid server address")?;

    let state = AppState::build(config, pool.clone())
        .await
        .context("failed to load targets and history")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(CleanupLogsJob::new(
        Arc::clone(&state.logs),
        state.config.limits.log_retention_days,
    ));
    scheduler.register(RefreshTargetsJob::new(
        Arc::clone(&state.targets),
        state.config.tracking.target_refresh_secs,
    ));
    scheduler.register(PoolMetricsJob::new(pool));
    scheduler.start();

    if state.config.tracking.auto_start {
        info!("Auto-start enabled, starting tracking");
        state.controller.start().await;
    }

    let controller = Arc::clone(&state.controller);
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping tracking");
    controller.stop().await;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
