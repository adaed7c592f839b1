use std::sync::Arc;

use axum::{
    Extension,
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::recommendation::RecommendationService;

pub fn recommendation_routes(state: Arc<AppConfig>) -> Router {
    let service = Arc::new(RecommendationService::new(&state));
    recommendation_routes_with(state, service)
}

/// Every request is served by the same `service` and its HTTP clients.
pub fn recommendation_routes_with(state: Arc<AppConfig>, service: Arc<RecommendationService>) -> Router {
    let public_routes = Router::new()
        .route("/chat", post(handlers::chat));

    let protected_routes = Router::new()
        .route("/recommendations", get(handlers::get_recommendations))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(service))
        .with_state(state)
}
