// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use crate::application::analytics_service::AnalyticsService;
use crate::application::refresh_coordinator::{CoordinatorSettings, RefreshCoordinator};
use crate::application::report_service::ReportService;
use crate::infrastructure::api_client::HttpDashboardApi;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::retry::RetryPolicy;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;
use crate::presentation::view_store::ViewStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Load configuration
    let config = load_dashboard_config()?;
    let period = config.refresh.default_period()?;
    let addr = config.server.socket_addr()?;

    // Backend client (infrastructure layer)
    let retry = RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay());
    let api = Arc::new(HttpDashboardApi::new(&config.api, &config.refresh, retry));

    // Services (application layer)
    let store = Arc::new(ViewStore::new(config.thresholds));
    let analytics = AnalyticsService::new(api.clone(), config.refresh.analytics_ttl());
    let settings = CoordinatorSettings {
        interval: config.refresh.interval(),
        max_points: config.refresh.max_points,
        violations_limit: config.refresh.violations_limit,
        thresholds: config.thresholds,
    };
    let coordinator = Arc::new(RefreshCoordinator::new(
        api.clone(),
        store.clone(),
        analytics,
        settings,
        period,
    ));
    let refresh_loop = tokio::spawn(coordinator.clone().run());

    let state = Arc::new(AppState {
        coordinator: coordinator.clone(),
        store,
        reports: ReportService::new(api),
    });
    let router = build_router(state);

    tracing::info!(%addr, backend = %config.api.base_url, %period, "Starting environment dashboard");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            coordinator.shutdown();
        })
        .await?;

    refresh_loop.await?;
    Ok(())
}
