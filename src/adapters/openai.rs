//! Reasoning service backed by the OpenAI Assistants API (v2).
//!
//! Sessions map to threads and analysis jobs map to runs. The analyst
//! assistant is created on first use unless an id is configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ensure_success, ReasoningService, RemoteJob, RemoteJobStatus, ToolCall, ToolOutput};
use crate::config::ReasoningSettings;

/// Instructions and tools the assistant is created with
#[derive(Debug, Clone)]
pub struct AssistantProfile {
    pub instructions: String,
    /// Function tool definitions (JSON array)
    pub tools: serde_json::Value,
}

/// OpenAI Assistants client
pub struct OpenAiAssistants {
    base_url: String,
    api_key: String,
    model: String,
    profile: AssistantProfile,
    assistant_id: OnceCell<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    value: String,
}

impl From<RunResponse> for RemoteJob {
    fn from(run: RunResponse) -> Self {
        let required_actions = run
            .required_action
            .map(|action| {
                action
                    .submit_tool_outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        function: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: run.id,
            status: RemoteJobStatus::parse(&run.status),
            last_error: run
                .last_error
                .map(|e| format!("{}: {}", e.code, e.message)),
            required_actions,
        }
    }
}

/// Text of the newest assistant message in a newest-first listing
fn newest_assistant_text(messages: MessageList) -> Option<String> {
    messages
        .data
        .into_iter()
        .find(|m| m.role == "assistant")
        .map(|m| {
            m.content
                .into_iter()
                .filter(|c| c.kind == "text")
                .filter_map(|c| c.text.map(|t| t.value))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.trim().is_empty())
}

impl OpenAiAssistants {
    pub fn new(settings: &ReasoningSettings, api_key: String, profile: AssistantProfile) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            profile,
            assistant_id: OnceCell::new_with(settings.assistant_id.clone()),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request with auth headers and decode the JSON reply
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .with_context(|| format!("Failed to reach reasoning service ({})", what))?;

        let response = ensure_success(response, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from reasoning service ({})", what))
    }

    /// Configured assistant id, creating the analyst assistant once if needed
    async fn assistant_id(&self) -> Result<&str> {
        let id = self
            .assistant_id
            .get_or_try_init(|| self.create_assistant())
            .await?;
        Ok(id.as_str())
    }

    fn assistant_body(&self) -> serde_json::Value {
        json!({
            "name": "KYC Analysis Assistant",
            "description": "KYC compliance analyst adjudicating screening evidence",
            "model": self.model,
            "instructions": self.profile.instructions,
            "tools": self.profile.tools,
            "metadata": {"specialization": "kyc_compliance"},
        })
    }

    async fn create_assistant(&self) -> Result<String> {
        info!(model = %self.model, "Creating KYC analysis assistant");

        let body = self.assistant_body();

        let created: IdResponse = self
            .send(self.client.post(self.url("assistants")).json(&body), "create assistant")
            .await?;
        Ok(created.id)
    }
}

#[async_trait]
impl ReasoningService for OpenAiAssistants {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_session(&self) -> Result<String> {
        let thread: IdResponse = self
            .send(self.client.post(self.url("threads")).json(&json!({})), "create thread")
            .await?;
        debug!(thread_id = %thread.id, "Thread created");
        Ok(thread.id)
    }

    async fn post_message(&self, session_id: &str, content: &str) -> Result<()> {
        let _: IdResponse = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{}/messages", session_id)))
                    .json(&json!({"role": "user", "content": content})),
                "create message",
            )
            .await?;
        Ok(())
    }

    async fn start_job(&self, session_id: &str, instructions: &str) -> Result<RemoteJob> {
        let assistant_id = self.assistant_id().await?.to_string();
        let run: RunResponse = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{}/runs", session_id)))
                    .json(&json!({
                        "assistant_id": assistant_id,
                        "instructions": instructions,
                    })),
                "create run",
            )
            .await?;
        Ok(run.into())
    }

    async fn poll_job(&self, session_id: &str, job_id: &str) -> Result<RemoteJob> {
        let run: RunResponse = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{}/runs/{}", session_id, job_id))),
                "retrieve run",
            )
            .await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        session_id: &str,
        job_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RemoteJob> {
        let run: RunResponse = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "threads/{}/runs/{}/submit_tool_outputs",
                        session_id, job_id
                    )))
                    .json(&json!({"tool_outputs": outputs})),
                "submit tool outputs",
            )
            .await?;
        Ok(run.into())
    }

    async fn cancel_job(&self, session_id: &str, job_id: &str) -> Result<()> {
        let _: RunResponse = self
            .send(
                self.client.post(self.url(&format!(
                    "threads/{}/runs/{}/cancel",
                    session_id, job_id
                ))),
                "cancel run",
            )
            .await?;
        Ok(())
    }

    async fn latest_reply(&self, session_id: &str) -> Result<String> {
        let messages: MessageList = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{}/messages", session_id)))
                    .query(&[("order", "desc"), ("limit", "10")]),
                "list messages",
            )
            .await?;

        newest_assistant_text(messages)
            .with_context(|| format!("No assistant reply found in thread {}", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_response_with_required_action() {
        let run: RunResponse = serde_json::from_value(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "get_adverse_media", "arguments": "{}"}}
                    ]
                }
            }
        }))
        .unwrap();

        let job: RemoteJob = run.into();
        assert_eq!(job.status, RemoteJobStatus::RequiresAction);
        assert_eq!(job.required_actions.len(), 1);
        assert_eq!(job.required_actions[0].function, "get_adverse_media");
    }

    #[test]
    fn test_run_response_with_error() {
        let run: RunResponse = serde_json::from_value(json!({
            "id": "run_2",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "boom"}
        }))
        .unwrap();

        let job: RemoteJob = run.into();
        assert_eq!(job.status, RemoteJobStatus::Failed);
        assert_eq!(job.last_error.as_deref(), Some("server_error: boom"));
    }

    #[test]
    fn test_newest_assistant_text_skips_user_messages() {
        let messages: MessageList = serde_json::from_value(json!({
            "data": [
                {"role": "assistant", "content": [
                    {"type": "text", "text": {"value": "RISK_LEVEL: LOW"}}
                ]},
                {"role": "user", "content": [
                    {"type": "text", "text": {"value": "Please analyze"}}
                ]},
                {"role": "assistant", "content": [
                    {"type": "text", "text": {"value": "older reply"}}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(
            newest_assistant_text(messages).as_deref(),
            Some("RISK_LEVEL: LOW")
        );
    }

    #[test]
    fn test_no_assistant_reply() {
        let messages: MessageList = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(newest_assistant_text(messages).is_none());
    }

    fn profile() -> AssistantProfile {
        AssistantProfile {
            instructions: "You are a test analyst.".to_string(),
            tools: json!([]),
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let settings = ReasoningSettings {
            base_url: "https://api.openai.com/v1/".to_string(),
            ..Default::default()
        };
        let client = OpenAiAssistants::new(&settings, "key".to_string(), profile());
        assert_eq!(client.url("threads"), "https://api.openai.com/v1/threads");
    }

    #[test]
    fn test_assistant_is_created_from_profile() {
        let profile = AssistantProfile {
            instructions: "Adjudicate carefully.".to_string(),
            tools: json!([{"type": "function", "function": {"name": "get_identity"}}]),
        };
        let client =
            OpenAiAssistants::new(&ReasoningSettings::default(), "key".to_string(), profile);

        let body = client.assistant_body();
        assert_eq!(body["instructions"], "Adjudicate carefully.");
        assert_eq!(body["tools"][0]["function"]["name"], "get_identity");
        assert_eq!(body["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn test_configured_assistant_is_not_recreated() {
        // Unroutable base URL: any creation attempt would fail
        let settings = ReasoningSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            assistant_id: Some("asst_configured".to_string()),
            ..Default::default()
        };
        let client = OpenAiAssistants::new(&settings, "key".to_string(), profile());
        assert_eq!(client.assistant_id().await.unwrap(), "asst_configured");
    }
}
