use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

/// Public directory routes; only approved, active doctors are listed.
pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/search", get(handlers::search_by_specialty))
        .with_state(state)
}
