#![allow(dead_code)]

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS configuration for the in-browser problem workspace
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Collection-root create endpoint. Registered explicitly at the
        // trailing-slash path because axum 0.8's `nest` does not match the
        // prefix + "/" against an inner "/" route.
        .route(
            "/api/v1/sessions/",
            post(handlers::sessions::create_session).layer(cors.clone()),
        )
        .nest("/api/v1/sessions", sessions_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn sessions_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/{id}", get(handlers::sessions::get_session))
        .route("/{id}/start", post(handlers::sessions::start_session))
        .route("/{id}/run", post(handlers::sessions::run_once))
        .route("/{id}/tests", post(handlers::sessions::run_tests))
        .route("/{id}/hints", get(handlers::sessions::list_hints))
        .route("/{id}/assist", post(handlers::sessions::request_assist))
        .route("/{id}/finish", post(handlers::sessions::finish_session))
        .route(
            "/{id}/finalize/retry",
            post(handlers::sessions::retry_finalize),
        )
        .route("/{id}/stream", get(handlers::sse::session_stream))
}
