//! Tool-calling loop against a completion service.
//!
//! States: `AwaitingModel -> (ToolRequested -> ToolExecuting -> AwaitingModel)* -> Done`.
//! Every tool call in a model turn is answered with exactly one tool
//! message, in request order, before the model is called again. Tool
//! failures become `{"error": ...}` content instead of aborting the loop.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use doctor_cell::models::{DirectoryEntry, DoctorRecord, LookupScope};
use doctor_cell::services::directory::DoctorDirectory;

use crate::services::classifier::rules_as_guidance;
use crate::services::completion::{
    ChatMessage, CompletionError, CompletionService, ToolCall, ToolDefinition,
};

pub const FETCH_ALL_DOCTORS: &str = "fetch_all_doctors";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid agent transition from {from:?} on {event:?}")]
    InvalidTransition { from: AgentState, event: AgentEvent },

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingModel,
    ToolRequested,
    ToolExecuting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    /// Model reply carried one or more tool calls.
    ToolCallsReceived,
    /// Requested tools are being run.
    ExecutionStarted,
    /// One result per call was appended to the conversation.
    ResultsAppended,
    /// Model reply carried no tool calls.
    FinalAnswer,
    /// Step budget exhausted before a final answer.
    StepLimitReached,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done)
    }

    pub fn transition(self, event: AgentEvent) -> Result<AgentState, AgentError> {
        use AgentEvent::*;
        use AgentState::*;

        let next = match (self, event) {
            (AwaitingModel, ToolCallsReceived) => ToolRequested,
            (AwaitingModel, FinalAnswer) => Done,
            (AwaitingModel, StepLimitReached) => Done,
            (ToolRequested, ExecutionStarted) => ToolExecuting,
            (ToolExecuting, ResultsAppended) => AwaitingModel,
            (Done, _) => Done,
            (from, event) => return Err(AgentError::InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AgentConfig {
    /// Upper bound on model invocations per request.
    pub max_steps: usize,
    /// Applied to each model call and each tool execution.
    pub call_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// What the loop ended with.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    /// Final model text; `None` when the step limit cut the loop short.
    pub answer: Option<String>,
    /// Every doctor the tool returned during this conversation.
    pub snapshot: Vec<DoctorRecord>,
    pub steps: usize,
}

impl AgentOutcome {
    /// Doctors named in the answer that the tool actually returned, in
    /// answer order without duplicates.
    pub fn recommended(&self) -> Vec<DoctorRecord> {
        let Some(ids) = self.answer.as_deref().and_then(parse_doctor_ids) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(id.clone()))
            .filter_map(|id| self.snapshot.iter().find(|d| d.id == id).cloned())
            .collect()
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: FETCH_ALL_DOCTORS,
        description: "Fetch every approved doctor as a list of {id, practice} objects.",
        parameters: json!({ "type": "object", "properties": {}, "required": [] }),
    }]
}

pub fn system_instruction() -> String {
    format!(
        "You help patients find the right doctor.\n{}\n\
         Call {} to get the doctors with their ids and practices. \
         Answer with only a JSON array of the ids of doctors whose practice matches \
         the specialties you chose, for example [\"id1\", \"id2\"]. \
         Answer [] when no doctor matches.",
        rules_as_guidance(),
        FETCH_ALL_DOCTORS
    )
}

struct ToolOutput {
    content: String,
    records: Vec<DoctorRecord>,
}

impl ToolOutput {
    fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: json!({ "error": message.to_string() }).to_string(),
            records: Vec::new(),
        }
    }
}

pub struct ToolAgent<'a> {
    completion: &'a dyn CompletionService,
    directory: &'a dyn DoctorDirectory,
    scope: LookupScope,
    config: AgentConfig,
}

impl<'a> ToolAgent<'a> {
    pub fn new(
        completion: &'a dyn CompletionService,
        directory: &'a dyn DoctorDirectory,
        scope: LookupScope,
        config: AgentConfig,
    ) -> Self {
        Self {
            completion,
            directory,
            scope,
            config,
        }
    }

    /// Runs the conversation until the model answers or the step budget is
    /// spent. Only completion-service failures are returned as errors.
    pub async fn run(&self, symptoms: &str) -> Result<AgentOutcome, AgentError> {
        let tools = tool_definitions();
        let mut messages = vec![
            ChatMessage::system(system_instruction()),
            ChatMessage::user(symptoms),
        ];
        let mut outcome = AgentOutcome::default();
        let mut state = AgentState::AwaitingModel;

        while !state.is_terminal() {
            if outcome.steps >= self.config.max_steps {
                warn!("Agent stopped after {} steps without a final answer", outcome.steps);
                state = state.transition(AgentEvent::StepLimitReached)?;
                continue;
            }

            outcome.steps += 1;
            debug!("Agent step {} awaiting model", outcome.steps);

            let reply = timeout(self.config.call_timeout, self.completion.complete(&messages, &tools))
                .await
                .map_err(|_| CompletionError::Timeout(self.config.call_timeout.as_secs()))??;

            if !reply.wants_tools() {
                outcome.answer = reply.content;
                state = state.transition(AgentEvent::FinalAnswer)?;
                continue;
            }

            state = state.transition(AgentEvent::ToolCallsReceived)?;
            debug!("Model requested {} tool call(s)", reply.tool_calls.len());
            messages.push(ChatMessage::assistant(reply.content.clone(), reply.tool_calls.clone()));

            state = state.transition(AgentEvent::ExecutionStarted)?;
            let outputs = join_all(reply.tool_calls.iter().map(|call| self.execute(call))).await;

            for (call, output) in reply.tool_calls.iter().zip(outputs) {
                for record in output.records {
                    if !outcome.snapshot.iter().any(|d| d.id == record.id) {
                        outcome.snapshot.push(record);
                    }
                }
                messages.push(ChatMessage::tool_result(call.id.clone(), output.content));
            }
            state = state.transition(AgentEvent::ResultsAppended)?;
        }

        info!(
            "Agent finished in {} step(s) with {} doctors in snapshot",
            outcome.steps,
            outcome.snapshot.len()
        );
        Ok(outcome)
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        if call.name != FETCH_ALL_DOCTORS {
            warn!("Model requested unknown tool {}", call.name);
            return ToolOutput::error(format!("Unknown tool: {}", call.name));
        }

        match timeout(self.config.call_timeout, self.directory.find_all(self.scope)).await {
            Ok(Ok(records)) => {
                let entries: Vec<DirectoryEntry> = records.iter().map(DoctorRecord::entry).collect();
                match serde_json::to_string(&entries) {
                    Ok(content) => ToolOutput { content, records },
                    Err(e) => ToolOutput::error(e),
                }
            }
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", call.name, e);
                ToolOutput::error(e)
            }
            Err(_) => {
                warn!("Tool {} timed out", call.name);
                ToolOutput::error("Tool execution timed out")
            }
        }
    }
}

/// Pulls doctor ids out of a model answer. Accepts a bare JSON array, the
/// first JSON array embedded in prose or a code fence, or an object with an
/// `ids` or `doctors` array. Array items may be strings, numbers or objects
/// with an `id`. `None` when no array can be found.
pub fn parse_doctor_ids(answer: &str) -> Option<Vec<String>> {
    let value = serde_json::from_str::<Value>(answer.trim())
        .ok()
        .or_else(|| first_embedded_array(answer))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("ids").or_else(|| map.remove("doctors")) {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    Some(items.iter().filter_map(item_id).collect())
}

/// Tries every `[` in order and keeps the first one that starts a complete
/// JSON array. Trailing text after the array is ignored.
fn first_embedded_array(answer: &str) -> Option<Value> {
    answer
        .match_indices('[')
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&answer[start..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
                .filter(Value::is_array)
        })
}

fn item_id(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("id").and_then(item_id),
        _ => None,
    }
}
