//! Shared fakes for integration tests.
//!
//! Every external collaborator is replaced through its trait; nothing here
//! touches the network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use kycflow::adapters::{
    CallbackPayload, EvidenceSource, IdentityExtractor, Notifier, ReasoningService, RemoteJob,
    RemoteJobStatus, ToolCall, ToolOutput,
};
use kycflow::domain::{Document, Evidence, IdentityInfo, Report};

pub fn jane_doe() -> IdentityInfo {
    IdentityInfo::new("Jane Doe", "1980-01-01").with_nationality("British", "gb")
}

/// A reply carrying every section
pub fn full_reply(risk: &str) -> String {
    format!(
        "Here is my assessment.

IDENTITY_VERIFICATION: Passport data is complete and consistent.

MATCH_QUALITY: One probable watchlist match on name and date of birth.

RISK_LEVEL: {risk}

SCREENING_SUMMARY: Watchlist returned one hit; sanctions and media were clear.

RISK_SUMMARY: The watchlist listing is recent and severe.

SUMMARY: Subject is probably the listed individual.

RECOMMENDATIONS: Escalate to enhanced due diligence."
    )
}

// ---------------------------------------------------------------------------
// Evidence sources
// ---------------------------------------------------------------------------

/// Returns a canned payload (or error) and normalizes it with a real adapter
pub struct CannedSource {
    inner: Arc<dyn EvidenceSource>,
    payload: std::result::Result<Value, String>,
    delay: Duration,
    pub finished: Arc<AtomicBool>,
}

impl CannedSource {
    pub fn ok(inner: Arc<dyn EvidenceSource>, payload: Value) -> Self {
        Self {
            inner,
            payload: Ok(payload),
            delay: Duration::ZERO,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing(inner: Arc<dyn EvidenceSource>, error: &str) -> Self {
        Self {
            inner,
            payload: Err(error.to_string()),
            delay: Duration::ZERO,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl EvidenceSource for CannedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn query(&self, _identity: &IdentityInfo) -> Result<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finished.store(true, Ordering::SeqCst);
        self.payload.clone().map_err(|e| anyhow::anyhow!(e))
    }

    fn normalize(&self, payload: Value) -> Result<Evidence> {
        self.inner.normalize(payload)
    }
}

/// A source that always produces the given evidence
pub struct StaticSource {
    pub name: String,
    pub evidence: Evidence,
}

#[async_trait]
impl EvidenceSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _identity: &IdentityInfo) -> Result<Value> {
        Ok(serde_json::to_value(&self.evidence)?)
    }

    fn normalize(&self, payload: Value) -> Result<Evidence> {
        Ok(serde_json::from_value(payload)?)
    }
}

// ---------------------------------------------------------------------------
// Reasoning service
// ---------------------------------------------------------------------------

/// Scripted reasoning service: `start_job` returns `initial`, each poll pops
/// the next scripted step, then `rest` repeats forever.
pub struct ScriptedReasoning {
    initial: RemoteJobStatus,
    polls: Mutex<VecDeque<std::result::Result<RemoteJob, String>>>,
    rest: RemoteJobStatus,
    reply: String,
    pub poll_count: AtomicUsize,
    pub cancelled: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<ToolOutput>>,
    pub posted: Mutex<Vec<String>>,
}

pub const JOB_ID: &str = "run_1";

impl ScriptedReasoning {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            initial: RemoteJobStatus::Queued,
            polls: Mutex::new(VecDeque::new()),
            rest: RemoteJobStatus::Completed,
            reply: reply.into(),
            poll_count: AtomicUsize::new(0),
            cancelled: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn starting(mut self, status: RemoteJobStatus) -> Self {
        self.initial = status;
        self
    }

    pub fn then(self, status: RemoteJobStatus) -> Self {
        self.polls
            .lock()
            .unwrap()
            .push_back(Ok(RemoteJob::new(JOB_ID, status)));
        self
    }

    pub fn then_job(self, job: RemoteJob) -> Self {
        self.polls.lock().unwrap().push_back(Ok(job));
        self
    }

    pub fn then_error(self, message: &str) -> Self {
        self.polls
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn forever(mut self, status: RemoteJobStatus) -> Self {
        self.rest = status;
        self
    }

    pub fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

pub fn tool_call(id: &str, function: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        function: function.to_string(),
        arguments: "{}".to_string(),
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_session(&self) -> Result<String> {
        Ok("thread_1".to_string())
    }

    async fn post_message(&self, _session_id: &str, content: &str) -> Result<()> {
        self.posted.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn start_job(&self, _session_id: &str, _instructions: &str) -> Result<RemoteJob> {
        Ok(RemoteJob::new(JOB_ID, self.initial.clone()))
    }

    async fn poll_job(&self, _session_id: &str, _job_id: &str) -> Result<RemoteJob> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(Ok(job)) => Ok(job),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(RemoteJob::new(JOB_ID, self.rest.clone())),
        }
    }

    async fn submit_tool_outputs(
        &self,
        _session_id: &str,
        job_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RemoteJob> {
        self.submitted.lock().unwrap().extend(outputs);
        Ok(RemoteJob::new(job_id, RemoteJobStatus::Queued))
    }

    async fn cancel_job(&self, _session_id: &str, job_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(job_id.to_string());
        Ok(())
    }

    async fn latest_reply(&self, _session_id: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

// ---------------------------------------------------------------------------
// Extraction and notification
// ---------------------------------------------------------------------------

pub struct FakeExtractor {
    pub identity: std::result::Result<IdentityInfo, String>,
    pub delay: Duration,
}

impl FakeExtractor {
    pub fn returning(identity: IdentityInfo) -> Self {
        Self {
            identity: Ok(identity),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            identity: Err(message.to_string()),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl IdentityExtractor for FakeExtractor {
    async fn extract(&self, _document: &Document) -> Result<IdentityInfo> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.identity.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail_callbacks: bool,
    pub fail_emails: bool,
    pub callbacks: Mutex<Vec<(String, CallbackPayload)>>,
    pub emails: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_callback(&self, url: &str, payload: &CallbackPayload) -> Result<()> {
        self.callbacks
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        if self.fail_callbacks {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }

    async fn send_report_email(&self, to: &str, report: &Report, _rendered: &str) -> Result<()> {
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), report.report_id.clone()));
        if self.fail_emails {
            anyhow::bail!("mail service unavailable");
        }
        Ok(())
    }
}
