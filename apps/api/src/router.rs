use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use doctor_cell::router::doctor_routes;
use recommendation_cell::recommendation_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic directory API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .merge(recommendation_routes(state))
}
