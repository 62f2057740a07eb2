use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::{
    ChannelLocationSource, LoggingAlertSink, MonitorController, MonitorDeps, StoreError,
};
use persistence::stores::{PgEventLog, PgTargetStore};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, locations, logs, targets, tracking};
use crate::services::HeartbeatKeepAlive;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub controller: Arc<MonitorController>,
    pub targets: Arc<PgTargetStore>,
    pub logs: Arc<PgEventLog>,
    /// Producer side of the location feed the monitor subscribes to.
    pub location: ChannelLocationSource,
}

impl AppState {
    /// Wires the PostgreSQL stores and host collaborators into a controller.
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, StoreError> {
        let targets = Arc::new(PgTargetStore::new(pool.clone()).await?);
        let logs = Arc::new(PgEventLog::new(pool.clone(), config.limits.log_window).await?);
        let location = ChannelLocationSource::new();

        let deps = MonitorDeps {
            targets: targets.clone(),
            event_log: logs.clone(),
            location: Arc::new(location.clone()),
            keep_alive: Arc::new(HeartbeatKeepAlive::new(Duration::from_secs(
                config.tracking.heartbeat_interval_secs,
            ))),
            alerts: Arc::new(LoggingAlertSink),
        };
        let controller = Arc::new(MonitorController::new(
            deps,
            config.tracking.monitor_settings(),
        ));

        Ok(Self {
            pool,
            config: Arc::new(config),
            controller,
            targets,
            logs,
            location,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    // The control surface is meant for a trusted local network.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tracking lifecycle
        .route("/api/v1/tracking/start", post(tracking::start_tracking))
        .route("/api/v1/tracking/stop", post(tracking::stop_tracking))
        .route("/api/v1/tracking/status", get(tracking::get_status))
        // Location ingestion
        .route("/api/v1/locations", post(locations::upload_fix))
        .route(
            "/api/v1/locations/provider-status",
            post(locations::report_provider_status),
        )
        // Targets
        .route(
            "/api/v1/targets",
            get(targets::list_targets).post(targets::create_target),
        )
        .route(
            "/api/v1/targets/:target_id",
            get(targets::get_target)
                .patch(targets::update_target)
                .delete(targets::delete_target),
        )
        .route(
            "/api/v1/targets/:target_id/active",
            put(targets::set_target_active),
        )
        // Activity history
        .route(
            "/api/v1/logs",
            get(logs::list_logs).delete(logs::clear_logs),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
