//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/counter",
            get(handlers::get_counter).post(handlers::increment_counter),
        )
        .route("/api/counter/reset", post(handlers::reset_counter));

    let mut router = Router::new()
        .route("/", get(handlers::index))
        // Health probe stays cheap and never fails the request
        .route("/health", get(handlers::health_check))
        .merge(api_routes);

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    if let Some(static_dir) = &state.config.server.static_dir {
        if static_dir.is_dir() {
            router = router.nest_service("/static", ServeDir::new(static_dir));
        } else {
            tracing::warn!(
                static_dir = %static_dir.display(),
                "Static directory does not exist, /static is disabled"
            );
        }
    }

    if state.config.server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
