//! In-process stand-ins for the directory and the completion service.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use doctor_cell::models::{DoctorError, DoctorRecord, LookupScope};
use doctor_cell::services::directory::DoctorDirectory;

use crate::services::completion::{
    ChatMessage, CompletionError, CompletionReply, CompletionService, ToolDefinition,
};

pub fn record(id: &str, specialty: &str) -> DoctorRecord {
    DoctorRecord {
        id: id.to_string(),
        full_name: format!("Dr. {}", id),
        specialty: specialty.to_string(),
        location: Some("Clinic".to_string()),
        is_approved: true,
        is_active: true,
    }
}

pub struct StaticDirectory {
    records: Vec<DoctorRecord>,
    fail: bool,
    lookups: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(records: Vec<DoctorRecord>) -> Self {
        Self { records, fail: false, lookups: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { records: Vec::new(), fail: true, lookups: AtomicUsize::new(0) }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn visible(&self, scope: LookupScope) -> Result<Vec<DoctorRecord>, DoctorError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DoctorError::Store("connection refused".to_string()));
        }
        Ok(self
            .records
            .iter()
            .filter(|d| d.is_approved && (!scope.active_only || d.is_active))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DoctorDirectory for StaticDirectory {
    async fn find_by_specialty(
        &self,
        label: &str,
        scope: LookupScope,
    ) -> Result<Vec<DoctorRecord>, DoctorError> {
        let mut records = self.visible(scope)?;
        records.retain(|d| d.specialty.eq_ignore_ascii_case(label));
        Ok(records)
    }

    async fn find_all(&self, scope: LookupScope) -> Result<Vec<DoctorRecord>, DoctorError> {
        self.visible(scope)
    }
}

/// Replays canned replies in order and records every conversation it saw.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<CompletionReply, CompletionError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<CompletionReply, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CompletionReply, CompletionError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::InvalidResponse("script exhausted".to_string())))
    }
}
