pub mod agent;
pub mod classifier;
pub mod completion;
pub mod recommendation;

#[cfg(test)]
pub(crate) mod fakes;

pub use agent::{AgentConfig, ToolAgent};
pub use completion::{CompletionService, OpenAiCompletionClient};
pub use recommendation::{RecommendOptions, RecommendationService};
