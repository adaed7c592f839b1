use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion service is not configured")]
    NotConfigured,

    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("Completion call timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model. `id` must be echoed back on
/// the matching tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function the model may call, described with a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// One model turn: either a final answer or a batch of tool calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionReply {
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionReply, CompletionError>;
}

// OpenAI chat-completions wire format

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

// Some compatible servers send `"tool_calls": null` on plain answers.
#[derive(Debug, Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompletionClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OpenAiCompletionClient {
    pub fn new(config: &AppConfig) -> Result<Self, CompletionError> {
        if !config.is_completion_configured() {
            return Err(CompletionError::NotConfigured);
        }

        Ok(Self {
            http_client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            temperature: 0.0,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionReply, CompletionError> {
        let request = WireRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: tool.name,
                        description: tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
            temperature: self.temperature,
        };

        debug!("Calling completion service with {} messages", messages.len());

        let response = self.http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Completion service error ({}): {}", status, body);
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let message = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("No choices in response".to_string()))?
            .message;

        Ok(CompletionReply {
            content: message.content,
            tool_calls: message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_message_wire_shape() {
        let wire = WireMessage::from(&ChatMessage::tool_result("call_1", "[]"));
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value, json!({ "role": "tool", "content": "[]", "tool_call_id": "call_1" }));
    }

    #[test]
    fn test_assistant_tool_calls_wire_shape() {
        let message = ChatMessage::assistant(
            None,
            vec![ToolCall {
                id: "call_1".into(),
                name: "fetch_all_doctors".into(),
                arguments: "{}".into(),
            }],
        );
        let value = serde_json::to_value(WireMessage::from(&message)).unwrap();

        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "fetch_all_doctors");
        assert!(value["content"].is_null());
    }

    #[test]
    fn test_unconfigured_client_is_rejected() {
        let config = AppConfig {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_model: "gpt-4o-mini".into(),
            recommendation_mode: shared_config::RecommendationMode::ToolAugmented,
            agent_max_steps: 5,
            completion_timeout_secs: 30,
            port: 3000,
        };
        assert!(matches!(OpenAiCompletionClient::new(&config), Err(CompletionError::NotConfigured)));
    }
}
