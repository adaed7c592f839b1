use serde::{Deserialize, Serialize};

use doctor_cell::models::DoctorSummary;

/// `POST /chat` body. `ocrText` is text extracted from an uploaded report
/// and is treated exactly like typed symptoms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub ocr_text: Option<String>,
    pub specialty: Option<String>,
    pub limit: Option<usize>,
}

impl ChatRequest {
    pub fn to_query(&self) -> SymptomQuery {
        let text = [self.message.as_deref(), self.ocr_text.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        SymptomQuery {
            text,
            specialty_override: self.specialty.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<DoctorSummary>>,
}

/// `GET /recommendations` query.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationQuery {
    pub symptoms: Option<String>,
    pub specialty: Option<String>,
    pub limit: Option<usize>,
}

impl RecommendationQuery {
    pub fn to_query(&self) -> SymptomQuery {
        SymptomQuery {
            text: self.symptoms.clone().unwrap_or_default(),
            specialty_override: self.specialty.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymptomQuery {
    pub text: String,
    pub specialty_override: Option<String>,
}

impl SymptomQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            specialty_override: None,
        }
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty_override = Some(specialty.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationResult {
    /// User-facing sentence describing the outcome.
    pub response: String,
    /// Specialties the doctors were drawn from.
    pub specialties: Vec<String>,
    /// Duplicate-free, in lookup (or model answer) order.
    pub doctors: Vec<DoctorSummary>,
}

impl RecommendationResult {
    pub fn ids(&self) -> Vec<&str> {
        self.doctors.iter().map(|d| d.id.as_str()).collect()
    }
}

impl From<RecommendationResult> for ChatResponse {
    fn from(result: RecommendationResult) -> Self {
        Self {
            response: result.response,
            data: Some(result.doctors).filter(|doctors| !doctors.is_empty()),
        }
    }
}
