//! Outbound notifications: job callbacks and report emails.
//!
//! Callbacks are a JSON POST to the caller's URL. Email goes through a
//! SendGrid-style `mail/send` endpoint (202 Accepted on success).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::Notifier;
use crate::config::EmailSettings;
use crate::domain::{Job, JobStatus, Report};

/// Body of the completion callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackPayload {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl CallbackPayload {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            completed_at: job.completed_at,
            error: job.error.clone(),
        }
    }
}

/// Mail delivery credentials, present only when fully configured
struct MailAccount {
    url: String,
    api_key: String,
    from_email: String,
}

/// Notifier backed by plain HTTP calls
pub struct HttpNotifier {
    client: reqwest::Client,
    mail: Option<MailAccount>,
}

impl HttpNotifier {
    /// Create a notifier; email is disabled unless both key and sender are set
    pub fn new(settings: &EmailSettings, api_key: Option<String>) -> Self {
        let mail = match (api_key, settings.from_email.clone()) {
            (Some(api_key), Some(from_email)) => Some(MailAccount {
                url: settings.sendgrid_url.clone(),
                api_key,
                from_email,
            }),
            (None, _) => {
                warn!("SendGrid API key not configured, email notifications disabled");
                None
            }
            (_, None) => {
                warn!("Sender email not configured, email notifications disabled");
                None
            }
        };

        Self {
            client: reqwest::Client::new(),
            mail,
        }
    }

    pub fn email_enabled(&self) -> bool {
        self.mail.is_some()
    }
}

/// SendGrid v3 request body carrying the rendered report as plain text
fn mail_body(from: &str, to: &str, report: &Report, rendered: &str) -> serde_json::Value {
    json!({
        "personalizations": [{"to": [{"email": to}]}],
        "from": {"email": from},
        "subject": format!("KYC Report {}", report.report_id),
        "content": [{
            "type": "text/plain",
            "value": format!(
                "Your KYC report {} is below.\n\nThis is an automated message.\n\n{}",
                report.report_id, rendered
            ),
        }],
    })
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_callback(&self, url: &str, payload: &CallbackPayload) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send callback to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Callback to {} returned status {}", url, status);
        }

        info!(job_id = %payload.job_id, "Callback sent");
        Ok(())
    }

    async fn send_report_email(&self, to: &str, report: &Report, rendered: &str) -> Result<()> {
        let Some(ref mail) = self.mail else {
            anyhow::bail!("Email delivery is not configured");
        };

        let response = self
            .client
            .post(&mail.url)
            .header("Authorization", format!("Bearer {}", mail.api_key))
            .json(&mail_body(&mail.from_email, to, report, rendered))
            .send()
            .await
            .context("Failed to reach mail service")?;

        let status = response.status();
        if status.as_u16() != 202 {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Unexpected mail service status {}: {}", status, text.trim());
        }

        info!(report_id = %report.report_id, %to, "Report emailed");
        Ok(())
    }
}
