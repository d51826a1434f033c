//! Job lifecycle state.
//!
//! A Job tracks one submission from upload to a terminal state. Status only
//! moves forward: `submitted -> processing -> (completed | failed)`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::report::Report;

/// Errors raised by job bookkeeping and queries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Report not ready. Current status: {status}")]
    ReportNotReady { job_id: Uuid, status: JobStatus },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Error message only valid for failed status")]
    ErrorOnNonFailed,

    #[error("Unsupported document type '{extension}', expected one of: {allowed}")]
    UnsupportedDocument { extension: String, allowed: String },

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Failed to render report: {0}")]
    Render(String),
}

/// Processing status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to announce the outcome of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTargets {
    pub callback_url: Option<String>,
    pub email: Option<String>,
}

/// Outcome of one notification delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryStatus {
    pub fn from_result(result: &Result<(), String>) -> Self {
        Self {
            success: result.is_ok(),
            timestamp: Utc::now(),
            error: result.as_ref().err().cloned(),
        }
    }
}

/// A timestamped metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// One submission and everything recorded about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    /// Set once the job reaches a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    pub status: JobStatus,

    /// Present only for completed jobs
    pub report: Option<Report>,

    /// Present only for failed jobs
    pub error: Option<String>,

    /// Original file name of the submitted document
    pub document_name: String,

    /// SHA256 of the submitted document bytes (hex)
    pub document_sha256: String,

    pub callback_url: Option<String>,

    pub email_notification: Option<String>,

    pub callback_status: Option<DeliveryStatus>,

    pub email_status: Option<DeliveryStatus>,

    /// Processing log (key -> value + timestamp)
    pub metadata: BTreeMap<String, MetadataEntry>,
}

impl Job {
    /// Create a job in the `submitted` state
    pub fn new(
        id: Uuid,
        document_name: String,
        document_sha256: String,
        targets: NotificationTargets,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            completed_at: None,
            status: JobStatus::Submitted,
            report: None,
            error: None,
            document_name,
            document_sha256,
            callback_url: targets.callback_url,
            email_notification: targets.email,
            callback_status: None,
            email_status: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a new status, enforcing the forward-only lifecycle
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Move to a new status with an error message (only valid for `failed`)
    pub fn transition_with_error(
        &mut self,
        next: JobStatus,
        error: String,
    ) -> Result<(), JobError> {
        if next != JobStatus::Failed {
            return Err(JobError::ErrorOnNonFailed);
        }
        self.transition(next)?;
        self.error = Some(error);
        Ok(())
    }

    /// Begin background processing
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Processing)
    }

    /// Attach the report and mark the job completed
    pub fn complete(&mut self, report: Report) -> Result<(), JobError> {
        self.transition(JobStatus::Completed)?;
        self.report = Some(report);
        Ok(())
    }

    /// Record the error and mark the job failed
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition_with_error(JobStatus::Failed, error.into())
    }

    /// Add processing metadata with the current timestamp
    pub fn add_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(
            key.into(),
            MetadataEntry {
                value,
                timestamp: Utc::now(),
            },
        );
    }

    pub fn set_email_status(&mut self, result: &Result<(), String>) {
        self.email_status = Some(DeliveryStatus::from_result(result));
    }

    pub fn set_callback_status(&mut self, result: &Result<(), String>) {
        self.callback_status = Some(DeliveryStatus::from_result(result));
    }

    /// Seconds between creation and completion, once terminal
    pub fn duration(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds() as f64 / 1000.0)
    }
}
