//! Long-running analysis jobs on the reasoning service.
//!
//! The monitor opens a session, posts the evidence bundle, starts a job and
//! polls it to a terminal state. Polling is bounded by a wall-clock budget;
//! when the budget runs out the remote job is cancelled on a best-effort
//! basis. Rate-limited polls back off and retry the same poll.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::parser::{self, ParseError};
use super::prompt::{
    build_analysis_prompt, ANALYSIS_INSTRUCTIONS, TOOL_GET_ADVERSE_MEDIA,
    TOOL_GET_COMPLIANCE_MATCHES, TOOL_GET_IDENTITY,
};
use crate::adapters::{ReasoningService, RemoteJob, RemoteJobStatus, ToolCall, ToolOutput};
use crate::config::ReasoningSettings;
use crate::domain::{AdjudicationResult, IdentityInfo, Match, MediaFinding};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis job {job_id} timed out after {seconds}s")]
    Timeout { job_id: String, seconds: u64 },

    #[error("Analysis job {job_id} ended in state '{state}': {}", .detail.as_deref().unwrap_or("no detail"))]
    JobFailed {
        job_id: String,
        state: String,
        detail: Option<String>,
    },

    #[error("Failed to encode analysis input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Polling cadence and budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub rate_limit_backoff: Duration,
    pub timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

impl From<&ReasoningSettings> for MonitorSettings {
    fn from(settings: &ReasoningSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            rate_limit_backoff: settings.rate_limit_backoff(),
            timeout: settings.timeout(),
        }
    }
}

/// What to do after observing a remote job status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Sleep one poll interval, then poll again
    Wait,
    /// Answer the requested tool calls, then poll again immediately
    SubmitToolOutputs,
    /// Fetch the reply and parse it
    FetchReply,
    /// The remote job ended without a reply
    Fail,
}

pub fn next_action(status: &RemoteJobStatus) -> PollAction {
    match status {
        RemoteJobStatus::Queued | RemoteJobStatus::InProgress => PollAction::Wait,
        RemoteJobStatus::RequiresAction => PollAction::SubmitToolOutputs,
        RemoteJobStatus::Completed => PollAction::FetchReply,
        RemoteJobStatus::Failed | RemoteJobStatus::Expired | RemoteJobStatus::Cancelled => {
            PollAction::Fail
        }
        RemoteJobStatus::Unknown(_) => PollAction::Wait,
    }
}

/// Transient rate-limit errors are recognized by their message
pub fn is_rate_limited(error: &anyhow::Error) -> bool {
    format!("{:#}", error).to_lowercase().contains("rate limit")
}

/// Precomputed answers to the analyst's tool calls
#[derive(Debug, Clone)]
pub struct ToolOutputs {
    outputs: HashMap<&'static str, String>,
}

impl ToolOutputs {
    pub fn new(
        identity: &IdentityInfo,
        matches: &[Match],
        media: &[MediaFinding],
    ) -> serde_json::Result<Self> {
        let outputs = HashMap::from([
            (TOOL_GET_IDENTITY, serde_json::to_string(identity)?),
            (TOOL_GET_COMPLIANCE_MATCHES, serde_json::to_string(matches)?),
            (TOOL_GET_ADVERSE_MEDIA, serde_json::to_string(media)?),
        ]);
        Ok(Self { outputs })
    }

    /// One output per call; unknown tools get a JSON error instead of failing the run
    pub fn answer(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        calls
            .iter()
            .map(|call| {
                let output = match self.outputs.get(call.function.as_str()) {
                    Some(output) => output.clone(),
                    None => {
                        warn!(tool = %call.function, "Analyst requested an unknown tool");
                        json!({"error": format!("Unknown tool: {}", call.function)}).to_string()
                    }
                };
                ToolOutput {
                    tool_call_id: call.id.clone(),
                    output,
                }
            })
            .collect()
    }
}

/// Drives one analysis job from submission to a parsed adjudication
#[derive(Clone)]
pub struct AnalysisJobMonitor {
    service: Arc<dyn ReasoningService>,
    settings: MonitorSettings,
}

impl AnalysisJobMonitor {
    pub fn new(service: Arc<dyn ReasoningService>, settings: MonitorSettings) -> Self {
        Self { service, settings }
    }

    #[instrument(skip_all, fields(service = self.service.name()))]
    pub async fn run_analysis(
        &self,
        identity: &IdentityInfo,
        matches: &[Match],
        media: &[MediaFinding],
    ) -> Result<AdjudicationResult, AnalysisError> {
        let prompt = build_analysis_prompt(identity, matches, media)?;
        let tools = ToolOutputs::new(identity, matches, media)?;

        let session = self
            .service
            .create_session()
            .await
            .context("Failed to create analysis session")?;
        self.service
            .post_message(&session, &prompt)
            .await
            .context("Failed to post analysis prompt")?;
        let job = self
            .service
            .start_job(&session, ANALYSIS_INSTRUCTIONS)
            .await
            .context("Failed to start analysis job")?;

        info!(job_id = %job.id, "Analysis job started");
        let job_id = job.id.clone();

        let polled =
            tokio::time::timeout(self.settings.timeout, self.poll_until_done(&session, job, &tools))
                .await;

        let reply = match polled {
            Ok(reply) => reply?,
            Err(_) => {
                warn!(%job_id, "Analysis job exceeded its time budget, cancelling");
                if let Err(e) = self.service.cancel_job(&session, &job_id).await {
                    warn!(%job_id, error = %format!("{:#}", e), "Failed to cancel analysis job");
                }
                return Err(AnalysisError::Timeout {
                    job_id,
                    seconds: self.settings.timeout.as_secs(),
                });
            }
        };

        let result = parser::parse(&reply)?;
        info!(risk_level = %result.risk_level, "Analysis completed");
        Ok(result)
    }

    /// Follow the job through its states until a reply or a terminal failure
    async fn poll_until_done(
        &self,
        session: &str,
        mut job: RemoteJob,
        tools: &ToolOutputs,
    ) -> Result<String, AnalysisError> {
        loop {
            debug!(job_id = %job.id, status = job.status.as_str(), "Analysis job status");

            match next_action(&job.status) {
                PollAction::Wait => {
                    if let RemoteJobStatus::Unknown(ref raw) = job.status {
                        warn!(job_id = %job.id, status = %raw, "Unknown analysis job status");
                    }
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
                PollAction::SubmitToolOutputs => {
                    let outputs = tools.answer(&job.required_actions);
                    info!(job_id = %job.id, calls = outputs.len(), "Submitting tool outputs");
                    self.service
                        .submit_tool_outputs(session, &job.id, outputs)
                        .await
                        .with_context(|| format!("Failed to submit tool outputs for job {}", job.id))?;
                }
                PollAction::FetchReply => {
                    let reply = self
                        .service
                        .latest_reply(session)
                        .await
                        .with_context(|| format!("Failed to fetch reply for job {}", job.id))?;
                    return Ok(reply);
                }
                PollAction::Fail => {
                    return Err(AnalysisError::JobFailed {
                        job_id: job.id,
                        state: job.status.as_str().to_string(),
                        detail: job.last_error,
                    });
                }
            }

            job = self.poll_with_backoff(session, &job.id).await?;
        }
    }

    /// Poll once, retrying the same poll after rate-limit errors
    async fn poll_with_backoff(&self, session: &str, job_id: &str) -> Result<RemoteJob, AnalysisError> {
        loop {
            match self.service.poll_job(session, job_id).await {
                Ok(job) => return Ok(job),
                Err(e) if is_rate_limited(&e) => {
                    warn!(
                        %job_id,
                        backoff_secs = self.settings.rate_limit_backoff.as_secs(),
                        "Reasoning service rate limited, backing off"
                    );
                    tokio::time::sleep(self.settings.rate_limit_backoff).await;
                }
                Err(e) => {
                    return Err(e
                        .context(format!("Failed to poll analysis job {}", job_id))
                        .into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(next_action(&RemoteJobStatus::Queued), PollAction::Wait);
        assert_eq!(next_action(&RemoteJobStatus::InProgress), PollAction::Wait);
        assert_eq!(
            next_action(&RemoteJobStatus::RequiresAction),
            PollAction::SubmitToolOutputs
        );
        assert_eq!(next_action(&RemoteJobStatus::Completed), PollAction::FetchReply);
        for status in [
            RemoteJobStatus::Failed,
            RemoteJobStatus::Expired,
            RemoteJobStatus::Cancelled,
        ] {
            assert_eq!(next_action(&status), PollAction::Fail);
        }
        assert_eq!(
            next_action(&RemoteJobStatus::Unknown("incomplete".into())),
            PollAction::Wait
        );
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(&anyhow::anyhow!("Rate Limit exceeded")));
        assert!(is_rate_limited(
            &anyhow::anyhow!("retrieve run rate limit exceeded (429)").context("poll")
        ));
        assert!(!is_rate_limited(&anyhow::anyhow!("connection reset")));
    }

    #[test]
    fn test_unknown_tool_gets_error_output() {
        let identity = IdentityInfo::new("Jane Doe", "1980-01-01");
        let tools = ToolOutputs::new(&identity, &[], &[]).unwrap();

        let outputs = tools.answer(&[
            ToolCall {
                id: "call_1".into(),
                function: TOOL_GET_IDENTITY.into(),
                arguments: "{}".into(),
            },
            ToolCall {
                id: "call_2".into(),
                function: "lookup_registry".into(),
                arguments: "{}".into(),
            },
        ]);

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].output.contains("Jane Doe"));
        assert_eq!(outputs[1].tool_call_id, "call_2");
        let error: serde_json::Value = serde_json::from_str(&outputs[1].output).unwrap();
        assert_eq!(error["error"], "Unknown tool: lookup_registry");
    }

    #[test]
    fn test_job_failed_message_names_job_and_state() {
        let err = AnalysisError::JobFailed {
            job_id: "run_9".into(),
            state: "expired".into(),
            detail: None,
        };
        assert_eq!(
            err.to_string(),
            "Analysis job run_9 ended in state 'expired': no detail"
        );
    }
}
