//! Axum router construction for the sensor API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::commands;
use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// Static segments take priority over path parameters, so
/// `/api/sensor/events/poll` never reaches the `{id}` handler.
///
/// CORS allows any origin so dashboards served elsewhere can poll.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Status table
        .route(
            "/api/sensor/status",
            get(handlers::list_statuses).post(handlers::create_status),
        )
        .route(
            "/api/sensor/status/current/{sensor_id}",
            get(handlers::current_status),
        )
        .route(
            "/api/sensor/status/{id}",
            get(handlers::get_status).put(handlers::update_status),
        )
        .route(
            "/api/trigger/sensor/status/poll",
            get(handlers::poll_statuses),
        )
        // Commands
        .route("/api/sensor/error", post(commands::force_error))
        .route("/api/sensor/reboot", post(commands::force_reboot))
        // Event log
        .route(
            "/api/sensor/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/api/sensor/events/poll", get(handlers::poll_events))
        .route("/api/sensor/events/{id}", get(handlers::get_event))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
