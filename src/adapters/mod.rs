//! Adapter interfaces for external systems.
//!
//! Each external collaborator sits behind a trait so the orchestration
//! logic can be driven by fakes in tests:
//! - `EvidenceSource`: screening sources (watchlist, sanctions, adverse media)
//! - `ReasoningService`: the session-oriented analysis service
//! - `IdentityExtractor`: document-to-identity extraction
//! - `Notifier`: callback and email delivery

pub mod extraction;
pub mod media;
pub mod notify;
pub mod openai;
pub mod sanctions;
pub mod watchlist;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Document, Evidence, IdentityInfo, Report};

pub use extraction::HttpIdentityExtractor;
pub use media::MediaSource;
pub use notify::{CallbackPayload, HttpNotifier};
pub use openai::{AssistantProfile, OpenAiAssistants};
pub use sanctions::SanctionsSource;
pub use watchlist::WatchlistSource;

/// A screening source queried once per identity.
///
/// `query` performs the outbound call and returns the raw payload;
/// `normalize` maps that payload into canonical records. Keeping them apart
/// lets the mapping be tested without a network.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Source identity, written into every `Match::source` it produces
    fn name(&self) -> &str;

    /// Call the source for one identity
    async fn query(&self, identity: &IdentityInfo) -> Result<serde_json::Value>;

    /// Map a raw payload into matches and media findings
    fn normalize(&self, payload: serde_json::Value) -> Result<Evidence>;
}

/// Status of a job on the reasoning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Expired,
    Cancelled,
    /// Anything the service reports that we do not recognize
    Unknown(String),
}

impl RemoteJobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "expired" => Self::Expired,
            "cancelled" => Self::Cancelled,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Unknown(raw) => raw,
        }
    }
}

/// A tool call the remote job is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub function: String,
    pub arguments: String,
}

/// Output supplied for one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Snapshot of a remote analysis job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJob {
    pub id: String,
    pub status: RemoteJobStatus,
    /// Error detail reported by the service for failed jobs
    pub last_error: Option<String>,
    /// Outstanding tool calls when status is `RequiresAction`
    pub required_actions: Vec<ToolCall>,
}

impl RemoteJob {
    pub fn new(id: impl Into<String>, status: RemoteJobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            last_error: None,
            required_actions: Vec::new(),
        }
    }
}

/// Session-oriented reasoning service (create session, post, run, poll)
#[async_trait]
pub trait ReasoningService: Send + Sync {
    fn name(&self) -> &str;

    /// Open a new conversation session, returning its id
    async fn create_session(&self) -> Result<String>;

    /// Post a user message to the session
    async fn post_message(&self, session_id: &str, content: &str) -> Result<()>;

    /// Start an analysis job against the session
    async fn start_job(&self, session_id: &str, instructions: &str) -> Result<RemoteJob>;

    /// Fetch the current job state
    async fn poll_job(&self, session_id: &str, job_id: &str) -> Result<RemoteJob>;

    /// Answer outstanding tool calls
    async fn submit_tool_outputs(
        &self,
        session_id: &str,
        job_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RemoteJob>;

    /// Ask the service to stop the job
    async fn cancel_job(&self, session_id: &str, job_id: &str) -> Result<()>;

    /// Text of the most recent assistant reply in the session
    async fn latest_reply(&self, session_id: &str) -> Result<String>;
}

/// Document-to-identity extraction
#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    async fn extract(&self, document: &Document) -> Result<IdentityInfo>;
}

/// Outbound delivery of job outcomes
#[async_trait]
pub trait Notifier: Send + Sync {
    /// POST the terminal job status to a caller-supplied URL
    async fn send_callback(&self, url: &str, payload: &CallbackPayload) -> Result<()>;

    /// Email the rendered report
    async fn send_report_email(&self, to: &str, report: &Report, rendered: &str) -> Result<()>;
}

/// Fail with the response body when a source answers with a non-success status
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        anyhow::bail!("{} rate limit exceeded ({}): {}", what, status, text.trim());
    }
    anyhow::bail!("{} failed with status {}: {}", what, status, text.trim())
}
