//! Job lifecycle management.
//!
//! `submit` records a job and hands it to a detached background task, then
//! returns immediately. The task drives the job through
//! `submitted -> processing -> (completed | failed)`:
//!
//! 1. extract the identity from the document
//! 2. aggregate evidence from every source
//! 3. run the analysis job and parse the reply
//! 4. assemble and save the report
//!
//! Any stage error fails the job with the full error chain. Once terminal,
//! the outcome is announced by callback (both outcomes) and email (completed
//! only). Delivery failures are recorded on the job but never change its
//! status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::aggregator::EvidenceAggregator;
use super::monitor::AnalysisJobMonitor;
use super::registry::JobRegistry;
use super::report_store::{render_markdown, ReportArtifact, ReportFormat, ReportStore};
use crate::adapters::{CallbackPayload, IdentityExtractor, Notifier};
use crate::domain::{Document, Job, JobError, JobStatus, NotificationTargets, Report};

/// Collaborators shared by the manager and its background tasks
struct Pipeline {
    registry: JobRegistry,
    extractor: Arc<dyn IdentityExtractor>,
    aggregator: EvidenceAggregator,
    monitor: AnalysisJobMonitor,
    store: ReportStore,
    notifier: Arc<dyn Notifier>,
}

/// Owns every job of this process and the tasks processing them
#[derive(Clone)]
pub struct JobManager {
    pipeline: Arc<Pipeline>,
    allowed_extensions: Vec<String>,
    tasks: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl JobManager {
    pub fn new(
        extractor: Arc<dyn IdentityExtractor>,
        aggregator: EvidenceAggregator,
        monitor: AnalysisJobMonitor,
        store: ReportStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                registry: JobRegistry::new(),
                extractor,
                aggregator,
                monitor,
                store,
                notifier,
            }),
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Restrict accepted document extensions (lower case, no dot)
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    fn validate(&self, document: &Document) -> Result<(), JobError> {
        if document.bytes.is_empty() {
            return Err(JobError::EmptyDocument);
        }

        let extension = document.extension().unwrap_or_default();
        if !self.allowed_extensions.contains(&extension) {
            return Err(JobError::UnsupportedDocument {
                extension,
                allowed: self.allowed_extensions.join(", "),
            });
        }
        Ok(())
    }

    /// Record a new job and start processing it in the background
    pub async fn submit(
        &self,
        document: Document,
        targets: NotificationTargets,
    ) -> Result<Job, JobError> {
        self.validate(&document)?;

        let sha256 = document.sha256();
        let mut job = Job::new(Uuid::new_v4(), document.file_name.clone(), sha256.clone(), targets);
        job.add_metadata("document_sha256", json!(sha256));

        let job_id = job.id;
        self.pipeline.registry.insert(job.clone()).await;
        info!(%job_id, document = %job.document_name, "Job submitted");

        let pipeline = Arc::clone(&self.pipeline);
        let handle = tokio::spawn(pipeline.process(job_id, document));
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(job_id, handle);

        Ok(job)
    }

    pub async fn status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.pipeline.registry.get(job_id).await
    }

    /// Render the report of a completed job
    pub async fn report(
        &self,
        job_id: Uuid,
        format: ReportFormat,
    ) -> Result<ReportArtifact, JobError> {
        let job = self.pipeline.registry.get(job_id).await?;

        match (job.status, job.report) {
            (JobStatus::Completed, Some(report)) => ReportArtifact::render(&report, format)
                .map_err(|e| JobError::Render(e.to_string())),
            (status, _) => Err(JobError::ReportNotReady { job_id, status }),
        }
    }

    /// Most recent jobs first
    pub async fn list(&self, limit: usize) -> Vec<Job> {
        self.pipeline.registry.list(limit).await
    }

    /// Wait until the job is terminal and its notifications have been attempted
    pub async fn wait_for_terminal(&self, job_id: Uuid, poll: Duration) -> Result<Job, JobError> {
        loop {
            let job = self.pipeline.registry.get(job_id).await?;
            if job.is_terminal() {
                break;
            }
            tokio::time::sleep(poll).await;
        }

        let handle = self.tasks.lock().await.remove(&job_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(%job_id, error = %e, "Job task did not finish cleanly");
            }
        }

        self.pipeline.registry.get(job_id).await
    }
}

impl Pipeline {
    /// Background task for one job; never panics the process on stage errors
    #[instrument(skip(self, document))]
    async fn process(self: Arc<Self>, job_id: Uuid, document: Document) {
        if let Err(e) = self.registry.update(job_id, Job::start).await.and_then(|r| r) {
            error!(error = %e, "Could not start job");
            return;
        }
        info!("Job processing");

        let finished = match self.run(job_id, &document).await {
            Ok(report) => {
                info!(report_id = %report.report_id, "Job completed");
                self.registry.update(job_id, |job| job.complete(report)).await
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, "Job failed");
                self.registry.update(job_id, |job| job.fail(message)).await
            }
        };

        if let Err(e) = finished.and_then(|r| r) {
            error!(error = %e, "Could not record job outcome");
            return;
        }

        self.notify(job_id).await;
    }

    async fn record(&self, job_id: Uuid, key: &str, value: serde_json::Value) {
        if let Err(e) = self.registry.update(job_id, |job| job.add_metadata(key, value)).await {
            warn!(%job_id, error = %e, "Could not record job metadata");
        }
    }

    async fn run(&self, job_id: Uuid, document: &Document) -> Result<Report> {
        let identity = self
            .extractor
            .extract(document)
            .await
            .context("Identity extraction failed")?;
        self.record(job_id, "identity_extracted", json!(identity.full_name))
            .await;

        let evidence = self
            .aggregator
            .aggregate(&identity)
            .await
            .context("Evidence aggregation failed")?;
        self.record(
            job_id,
            "evidence_gathered",
            json!({"matches": evidence.matches.len(), "media": evidence.media.len()}),
        )
        .await;

        let adjudication = self
            .monitor
            .run_analysis(&identity, &evidence.matches, &evidence.media)
            .await
            .context("Analysis failed")?;
        self.record(
            job_id,
            "analysis_completed",
            json!({"risk_level": adjudication.risk_level}),
        )
        .await;

        let report = Report::assemble(identity, evidence, adjudication);
        let saved = self
            .store
            .save(&report)
            .await
            .context("Failed to save report")?;
        self.record(
            job_id,
            "report_saved",
            json!({
                "json": saved.json_path.display().to_string(),
                "markdown": saved.markdown_path.display().to_string(),
            }),
        )
        .await;

        Ok(report)
    }

    /// Announce the terminal outcome; failures are recorded, never raised
    async fn notify(&self, job_id: Uuid) {
        let job = match self.registry.get(job_id).await {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "Job vanished before notification");
                return;
            }
        };

        if let Some(ref url) = job.callback_url {
            let result = self
                .notifier
                .send_callback(url, &CallbackPayload::from_job(&job))
                .await
                .map_err(|e| format!("{:#}", e));

            let entry = match result {
                Ok(()) => ("callback_sent", json!(url)),
                Err(ref e) => {
                    warn!(error = %e, "Callback delivery failed");
                    ("callback_error", json!(e))
                }
            };
            let recorded = self
                .registry
                .update(job_id, |job| {
                    job.set_callback_status(&result);
                    job.add_metadata(entry.0, entry.1);
                })
                .await;
            if let Err(e) = recorded {
                warn!(error = %e, "Could not record callback outcome");
            }
        }

        let (Some(to), Some(report)) = (&job.email_notification, &job.report) else {
            return;
        };
        if job.status != JobStatus::Completed {
            return;
        }

        let result = self
            .notifier
            .send_report_email(to, report, &render_markdown(report))
            .await
            .map_err(|e| format!("{:#}", e));

        let entry = match result {
            Ok(()) => ("email_sent", json!(to)),
            Err(ref e) => {
                warn!(error = %e, "Email delivery failed");
                ("email_error", json!(e))
            }
        };
        let recorded = self
            .registry
            .update(job_id, |job| {
                job.set_email_status(&result);
                job.add_metadata(entry.0, entry.1);
            })
            .await;
        if let Err(e) = recorded {
            warn!(error = %e, "Could not record email outcome");
        }
    }
}
