use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use doctor_cell::models::LookupScope;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ChatRequest, ChatResponse, RecommendationQuery};
use crate::services::recommendation::{RecommendOptions, RecommendationService};

/// Public chat entry point. A body that is not a JSON object with the
/// expected fields is answered like any other internal failure.
#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    Extension(service): Extension<Arc<RecommendationService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected chat body: {}", e);
        AppError::Internal(e.to_string())
    })?;

    let query = request.to_query();
    debug!("Chat request with {} chars of symptom text", query.text.len());

    let options = RecommendOptions {
        limit: request.limit,
        scope: LookupScope::public(),
        mode: state.recommendation_mode,
    };

    let result = service.recommend(&query, options).await;

    Ok(Json(ChatResponse::from(result)))
}

/// Authenticated rule-based recommendations. Admins also see approved
/// doctors who are currently inactive.
#[axum::debug_handler]
pub async fn get_recommendations(
    Extension(service): Extension<Arc<RecommendationService>>,
    Extension(user): Extension<User>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Value>, AppError> {
    let scope = if user.caller_role().is_admin() {
        LookupScope::approved()
    } else {
        LookupScope::public()
    };

    let result = service
        .recommend(&query.to_query(), RecommendOptions::rule_based(query.limit, scope))
        .await;

    info!("User {} received {} recommendations", user.id, result.doctors.len());

    Ok(Json(json!({
        "response": result.response,
        "specialties": result.specialties,
        "doctors": result.doctors,
        "total": result.doctors.len()
    })))
}
