use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use doctor_cell::models::{DoctorError, DoctorRecord, DoctorSummary, LookupScope};
use doctor_cell::services::directory::{DoctorDirectory, SupabaseDirectory};
use shared_config::{AppConfig, RecommendationMode};
use shared_models::error::GENERIC_ERROR_MESSAGE;

use crate::models::{RecommendationResult, SymptomQuery};
use crate::services::agent::{AgentConfig, AgentError, ToolAgent};
use crate::services::classifier::{classify, resolve_specialty};
use crate::services::completion::{CompletionService, OpenAiCompletionClient};

pub const HELP_MESSAGE: &str =
    "Please describe your symptoms or upload a medical report so we can suggest the right doctor.";

#[derive(Debug, Clone, Copy)]
pub struct RecommendOptions {
    /// Cap on returned doctors. `None` returns the full union.
    pub limit: Option<usize>,
    pub scope: LookupScope,
    pub mode: RecommendationMode,
}

impl RecommendOptions {
    pub fn rule_based(limit: Option<usize>, scope: LookupScope) -> Self {
        Self {
            limit,
            scope,
            mode: RecommendationMode::RuleBased,
        }
    }
}

/// Symptom text in, doctors out.
pub struct RecommendationService {
    directory: Arc<dyn DoctorDirectory>,
    completion: Option<Arc<dyn CompletionService>>,
    agent_config: AgentConfig,
}

impl RecommendationService {
    pub fn new(config: &AppConfig) -> Self {
        let completion: Option<Arc<dyn CompletionService>> = match OpenAiCompletionClient::new(config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                debug!("Tool-augmented mode unavailable: {}", e);
                None
            }
        };

        Self::with_collaborators(
            Arc::new(SupabaseDirectory::new(config)),
            completion,
            AgentConfig {
                max_steps: config.agent_max_steps.max(1),
                call_timeout: Duration::from_secs(config.completion_timeout_secs.max(1)),
            },
        )
    }

    pub fn with_collaborators(
        directory: Arc<dyn DoctorDirectory>,
        completion: Option<Arc<dyn CompletionService>>,
        agent_config: AgentConfig,
    ) -> Self {
        Self {
            directory,
            completion,
            agent_config,
        }
    }

    /// Never fails: directory and completion errors are logged and turned
    /// into the generic fallback result.
    pub async fn recommend(&self, query: &SymptomQuery, options: RecommendOptions) -> RecommendationResult {
        if query.text.trim().is_empty() && query.specialty_override.is_none() {
            return RecommendationResult {
                response: HELP_MESSAGE.to_string(),
                ..Default::default()
            };
        }

        let completion = match (options.mode, &self.completion) {
            (RecommendationMode::ToolAugmented, Some(completion))
                if !query.text.trim().is_empty() && !is_direct_specialty(query) =>
            {
                Some(completion.as_ref())
            }
            (RecommendationMode::ToolAugmented, None) => {
                warn!("Tool-augmented mode requested without a completion service, using rules");
                None
            }
            _ => None,
        };

        let outcome = match completion {
            Some(completion) => self
                .recommend_with_agent(completion, query, options.limit, options.scope)
                .await
                .map_err(|e| error!("Tool-augmented recommendation failed: {}", e)),
            None => self
                .recommend_by_rules(query, options.limit, options.scope)
                .await
                .map_err(|e| error!("Rule-based recommendation failed: {}", e)),
        };

        outcome.unwrap_or_else(|_| fallback())
    }

    /// Classifies the query, looks up every matched specialty and returns
    /// the union in specialty order.
    pub async fn recommend_by_rules(
        &self,
        query: &SymptomQuery,
        limit: Option<usize>,
        scope: LookupScope,
    ) -> Result<RecommendationResult, DoctorError> {
        let labels = specialties_for(query);
        if labels.is_empty() {
            return Ok(RecommendationResult {
                response: HELP_MESSAGE.to_string(),
                ..Default::default()
            });
        }

        debug!("Looking up specialties {:?}", labels);

        let per_label = try_join_all(
            labels.iter().map(|label| self.directory.find_by_specialty(label, scope)),
        )
        .await?;

        let mut doctors = union_in_order(per_label.into_iter().flatten());
        if let Some(limit) = limit {
            doctors.truncate(limit);
        }

        info!("Rule-based recommendation: {:?} -> {} doctors", labels, doctors.len());

        Ok(RecommendationResult {
            response: rule_response(&labels, !doctors.is_empty()),
            specialties: labels.iter().map(|l| l.to_string()).collect(),
            doctors,
        })
    }

    pub async fn recommend_with_agent(
        &self,
        completion: &dyn CompletionService,
        query: &SymptomQuery,
        limit: Option<usize>,
        scope: LookupScope,
    ) -> Result<RecommendationResult, AgentError> {
        let agent = ToolAgent::new(completion, self.directory.as_ref(), scope, self.agent_config);
        let outcome = agent.run(query.text.trim()).await?;

        let mut doctors: Vec<DoctorSummary> = outcome.recommended().iter().map(DoctorSummary::from).collect();
        if let Some(limit) = limit {
            doctors.truncate(limit);
        }

        let mut specialties: Vec<String> = Vec::new();
        for doctor in &doctors {
            if !specialties.contains(&doctor.practice) {
                specialties.push(doctor.practice.clone());
            }
        }

        info!("Tool-augmented recommendation returned {} doctors", doctors.len());

        let response = if doctors.is_empty() {
            "We couldn't find a matching doctor right now. Please try describing your symptoms differently.".to_string()
        } else {
            "Here are doctors who can help with your symptoms.".to_string()
        };

        Ok(RecommendationResult {
            response,
            specialties,
            doctors,
        })
    }
}

fn fallback() -> RecommendationResult {
    RecommendationResult {
        response: GENERIC_ERROR_MESSAGE.to_string(),
        ..Default::default()
    }
}

/// A known override wins; unknown overrides are ignored.
fn specialties_for(query: &SymptomQuery) -> Vec<&'static str> {
    if let Some(requested) = query.specialty_override.as_deref() {
        match resolve_specialty(requested) {
            Some(label) => return vec![label],
            None => debug!("Ignoring unknown specialty override {:?}", requested),
        }
    }
    classify(&query.text)
}

/// Queries that already name a specialty need no model.
fn is_direct_specialty(query: &SymptomQuery) -> bool {
    query
        .specialty_override
        .as_deref()
        .and_then(resolve_specialty)
        .or_else(|| resolve_specialty(&query.text))
        .is_some()
}

fn union_in_order(records: impl IntoIterator<Item = DoctorRecord>) -> Vec<DoctorSummary> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .map(|record| DoctorSummary::from(&record))
        .collect()
}

fn rule_response(labels: &[&str], found: bool) -> String {
    let joined = labels.join(" or ");
    if found {
        format!("Based on your symptoms, we recommend seeing a {}. Here are some available doctors.", joined)
    } else {
        format!("We could not find an available {} right now. Please try again later.", joined)
    }
}
