use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorError, DoctorRecord, LookupScope};

const PROFILES_PATH: &str = "/rest/v1/profiles";
const PROFILE_COLUMNS: &str = "id,full_name,specialty,location,is_approved,is_active";

/// Read-only view of approved doctors.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Approved doctors whose specialty equals `label`, ignoring case.
    /// No match is `Ok(vec![])`.
    async fn find_by_specialty(
        &self,
        label: &str,
        scope: LookupScope,
    ) -> Result<Vec<DoctorRecord>, DoctorError>;

    /// Every approved doctor in the directory.
    async fn find_all(&self, scope: LookupScope) -> Result<Vec<DoctorRecord>, DoctorError>;
}

/// Labels are a fixed set of plain words. Anything else would either be a
/// PostgREST `ilike` wildcard or cannot name a specialty.
fn is_plain_label(label: &str) -> bool {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z '&/\-]*$").expect("static label pattern"))
        .is_match(label)
}

fn retain_in_scope(records: &mut Vec<DoctorRecord>, scope: LookupScope) {
    records.retain(|d| d.is_approved && (!scope.active_only || d.is_active));
}

pub struct SupabaseDirectory {
    supabase: SupabaseClient,
}

impl SupabaseDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn base_query(scope: LookupScope) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("select", PROFILE_COLUMNS.to_string()),
            ("role", "eq.doctor".to_string()),
            ("is_approved", "eq.true".to_string()),
        ];
        if scope.active_only {
            query.push(("is_active", "eq.true".to_string()));
        }
        query
    }

    async fn fetch(&self, query: Vec<(&'static str, String)>) -> Result<Vec<DoctorRecord>, DoctorError> {
        let rows: Vec<Value> = self.supabase
            .select(PROFILES_PATH, &query, None)
            .await
            .map_err(|e| {
                error!("Doctor directory query failed: {}", e);
                DoctorError::from(e)
            })?;

        Ok(rows.into_iter()
            .filter_map(|row| match serde_json::from_value::<DoctorRecord>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed doctor row: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDirectory {
    async fn find_by_specialty(
        &self,
        label: &str,
        scope: LookupScope,
    ) -> Result<Vec<DoctorRecord>, DoctorError> {
        let label = label.trim();
        if !is_plain_label(label) {
            debug!("Skipping lookup for non-specialty label {:?}", label);
            return Ok(vec![]);
        }

        let mut query = Self::base_query(scope);
        query.push(("specialty", format!("ilike.{}", label)));
        query.push(("order", "created_at.asc".to_string()));

        let mut doctors = self.fetch(query).await?;
        retain_in_scope(&mut doctors, scope);
        doctors.retain(|d| d.specialty.trim().eq_ignore_ascii_case(label));

        debug!("Found {} {} doctors", doctors.len(), label);
        Ok(doctors)
    }

    async fn find_all(&self, scope: LookupScope) -> Result<Vec<DoctorRecord>, DoctorError> {
        let mut query = Self::base_query(scope);
        query.push(("order", "created_at.asc".to_string()));

        let mut doctors = self.fetch(query).await?;
        retain_in_scope(&mut doctors, scope);

        debug!("Directory snapshot holds {} doctors", doctors.len());
        Ok(doctors)
    }
}
