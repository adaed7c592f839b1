use std::env;
use std::str::FromStr;
use tracing::warn;

/// How `/chat` turns symptoms into doctors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationMode {
    /// Keyword classifier plus directory lookups, no external calls.
    RuleBased,
    /// Completion service with the `fetch_all_doctors` tool.
    ToolAugmented,
}

impl FromStr for RecommendationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "rule" | "rule-based" => Ok(RecommendationMode::RuleBased),
            "agent" | "llm" | "tool" | "tool-augmented" => Ok(RecommendationMode::ToolAugmented),
            other => Err(format!("Unknown recommendation mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub recommendation_mode: RecommendationMode,
    pub agent_max_steps: usize,
    pub completion_timeout_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            openai_api_key: env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_KEY not set, tool-augmented recommendations disabled");
                    String::new()
                }),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            recommendation_mode: env::var("RECOMMENDATION_MODE")
                .ok()
                .and_then(|raw| {
                    raw.parse()
                        .map_err(|e| warn!("{}, falling back to rules", e))
                        .ok()
                })
                .unwrap_or(RecommendationMode::RuleBased),
            agent_max_steps: parse_or("AGENT_MAX_STEPS", 5),
            completion_timeout_secs: parse_or("COMPLETION_TIMEOUT_SECS", 30),
            port: parse_or("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.recommendation_mode == RecommendationMode::ToolAugmented
            && !config.is_completion_configured()
        {
            warn!("RECOMMENDATION_MODE=agent but OPENAI_API_KEY is empty; rule-based mode will be used");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_completion_configured(&self) -> bool {
        !self.openai_api_key.is_empty() && !self.openai_base_url.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("rules".parse::<RecommendationMode>(), Ok(RecommendationMode::RuleBased));
        assert_eq!(" Agent ".parse::<RecommendationMode>(), Ok(RecommendationMode::ToolAugmented));
        assert!("magic".parse::<RecommendationMode>().is_err());
    }
}
