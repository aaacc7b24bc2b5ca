use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{confirmations, handlers, middleware::metrics_middleware, sync};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Sync trigger (OPTIONS answers the CORS preflight)
        .route("/sync", any(sync::trigger))
        // Stored confirmations
        .route("/confirmations", get(confirmations::list_confirmations))
        .route(
            "/confirmations/{correlation_id}",
            get(confirmations::get_confirmation),
        )
        .route_layer(middleware::from_fn(metrics_middleware));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
