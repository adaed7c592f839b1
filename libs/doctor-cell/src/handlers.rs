use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{DoctorRecord, DoctorSummary, LookupScope};
use crate::services::directory::{DoctorDirectory, SupabaseDirectory};

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SpecialtyQuery {
    pub specialty: String,
    pub limit: Option<usize>,
}

fn summaries<'a>(
    records: impl IntoIterator<Item = &'a DoctorRecord>,
    limit: Option<usize>,
) -> Vec<DoctorSummary> {
    records
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(DoctorSummary::from)
        .collect()
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = SupabaseDirectory::new(&state);

    let records = directory.find_all(LookupScope::public()).await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let doctors = summaries(&records, query.limit);

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn search_by_specialty(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SpecialtyQuery>,
) -> Result<Json<Value>, AppError> {
    if query.specialty.trim().is_empty() {
        return Err(AppError::BadRequest("specialty is required".to_string()));
    }

    let directory = SupabaseDirectory::new(&state);

    let records = directory.find_by_specialty(&query.specialty, LookupScope::public()).await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let doctors = summaries(&records, query.limit);

    info!("Specialty search '{}' returned {} doctors", query.specialty, doctors.len());

    Ok(Json(json!({
        "specialty": query.specialty.trim(),
        "doctors": doctors,
        "total": doctors.len()
    })))
}
