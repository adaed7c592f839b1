pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{ChatRequest, ChatResponse, RecommendationResult, SymptomQuery};
pub use router::{recommendation_routes, recommendation_routes_with};

pub mod api {
    pub use crate::services::classifier::classify;
    pub use crate::services::recommendation::{RecommendOptions, RecommendationService};
}
