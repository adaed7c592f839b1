use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, RecommendationMode};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub recommendation_mode: RecommendationMode,
    pub agent_max_steps: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "http://localhost:11434/v1".to_string(),
            recommendation_mode: RecommendationMode::RuleBased,
            agent_max_steps: 5,
        }
    }
}

impl TestConfig {
    /// Supabase pointed at a mock server, rule-based mode.
    pub fn with_supabase(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            ..Self::default()
        }
    }

    /// Supabase and the completion endpoint both served by `uri`, tool mode.
    pub fn with_agent(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            openai_api_key: "test-openai-key".to_string(),
            openai_base_url: format!("{}/v1", uri),
            recommendation_mode: RecommendationMode::ToolAugmented,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            openai_model: "test-model".to_string(),
            recommendation_mode: self.recommendation_mode,
            agent_max_steps: self.agent_max_steps,
            completion_timeout_secs: 5,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A `profiles` row for an approved, active doctor.
    pub fn doctor_row(id: &str, full_name: &str, specialty: &str) -> Value {
        json!({
            "id": id,
            "full_name": full_name,
            "specialty": specialty,
            "location": "Main Street Clinic",
            "is_approved": true,
            "is_active": true
        })
    }

    pub fn inactive_doctor_row(id: &str, full_name: &str, specialty: &str) -> Value {
        let mut row = Self::doctor_row(id, full_name, specialty);
        row["is_active"] = json!(false);
        row
    }
}

/// Chat-completions payloads in the OpenAI wire format.
pub struct MockCompletionResponses;

impl MockCompletionResponses {
    pub fn tool_call(call_id: &str, tool_name: &str) -> Value {
        json!({
            "id": format!("chatcmpl-{}", Uuid::new_v4()),
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": call_id,
                        "type": "function",
                        "function": { "name": tool_name, "arguments": "{}" }
                    }]
                }
            }]
        })
    }

    pub fn final_answer(content: &str) -> Value {
        json!({
            "id": format!("chatcmpl-{}", Uuid::new_v4()),
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": { "role": "assistant", "content": content }
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(!app_config.is_completion_configured());
    }

    #[test]
    fn test_agent_config_points_at_mock() {
        let app_config = TestConfig::with_agent("http://127.0.0.1:9999").to_app_config();
        assert_eq!(app_config.openai_base_url, "http://127.0.0.1:9999/v1");
        assert_eq!(app_config.recommendation_mode, RecommendationMode::ToolAugmented);
        assert!(app_config.is_completion_configured());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
