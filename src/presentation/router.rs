// Router - routes and middleware for the local dashboard surface
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    NDJSON, delete_notification, get_dashboard, get_report, health_check, post_force_cycle,
    post_refresh, put_period, stream_events,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Event streams are flushed line by line, never buffered by an encoder
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new(NDJSON)));

    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/events", get(stream_events))
        .route("/period", put(put_period))
        .route("/refresh", post(post_refresh))
        .route("/force-cycle", post(post_force_cycle))
        .route("/notifications/:id", delete(delete_notification))
        .route("/reports/:format", get(get_report))
        .layer(compression)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
