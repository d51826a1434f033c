//! Command-line interface for kycflow.
//!
//! Provides commands for running a KYC check on a document and inspecting
//! the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    AssistantProfile, EvidenceSource, HttpIdentityExtractor, HttpNotifier, MediaSource,
    OpenAiAssistants, SanctionsSource, WatchlistSource,
};
use crate::config::{self, ResolvedConfig};
use crate::core::prompt::{tool_definitions, ANALYST_PERSONA};
use crate::core::{
    AnalysisJobMonitor, EvidenceAggregator, JobManager, MonitorSettings, ReportFormat, ReportStore,
};
use crate::domain::{Document, JobStatus, NotificationTargets};

/// kycflow - KYC evidence aggregation and adjudication
#[derive(Parser, Debug)]
#[command(name = "kycflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a KYC check on an identity document and print the report
    Check {
        /// Path to the document image (jpg, jpeg, png)
        document: PathBuf,

        /// URL to POST the job outcome to
        #[arg(long, env = "KYCFLOW_CALLBACK_URL")]
        callback_url: Option<String>,

        /// Email the report to this address
        #[arg(long, env = "KYCFLOW_NOTIFY_EMAIL")]
        email: Option<String>,

        /// Report format to print
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: ReportFormat,
    },

    /// Show resolved configuration (secrets are never printed)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Check {
                document,
                callback_url,
                email,
                format,
            } => {
                let targets = NotificationTargets { callback_url, email };
                run_check(&document, targets, format).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Wire the real adapters from configuration
pub fn build_manager(cfg: &ResolvedConfig) -> Result<JobManager> {
    let secrets = &cfg.secrets;
    let openai_key = secrets
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;

    let sources: Vec<Arc<dyn EvidenceSource>> = vec![
        Arc::new(WatchlistSource::new(&cfg.sources.watchlist)),
        Arc::new(SanctionsSource::new(
            &cfg.sources.sanctions,
            secrets.sanctions_api_key.clone(),
        )),
        Arc::new(MediaSource::new(&cfg.sources.media, secrets.media_api_key.clone())),
    ];

    let profile = AssistantProfile {
        instructions: ANALYST_PERSONA.to_string(),
        tools: tool_definitions(),
    };
    let reasoning = Arc::new(OpenAiAssistants::new(&cfg.reasoning, openai_key, profile));
    let monitor = AnalysisJobMonitor::new(reasoning, MonitorSettings::from(&cfg.reasoning));

    let extractor = Arc::new(HttpIdentityExtractor::new(
        cfg.extraction.url.clone(),
        secrets.idcheck_api_key.clone(),
    ));
    let notifier = Arc::new(HttpNotifier::new(
        &cfg.notifications,
        secrets.sendgrid_api_key.clone(),
    ));

    Ok(JobManager::new(
        extractor,
        EvidenceAggregator::new(sources),
        monitor,
        ReportStore::new(cfg.reports.clone()),
        notifier,
    )
    .with_allowed_extensions(cfg.extraction.allowed_extensions.clone()))
}

/// Submit a document, wait for the outcome and print the report
async fn run_check(path: &Path, targets: NotificationTargets, format: ReportFormat) -> Result<()> {
    let cfg = config::config()?;
    let manager = build_manager(cfg)?;

    let document = Document::from_path(path).await?;
    let job = manager.submit(document, targets).await?;
    eprintln!("Submitted job {} ({})", job.id, job.document_name);

    let job = manager
        .wait_for_terminal(job.id, Duration::from_millis(500))
        .await?;

    match job.status {
        JobStatus::Completed => {
            let artifact = manager.report(job.id, format).await?;
            println!("{}", artifact.body);
            eprintln!(
                "Job {} completed in {:.1}s, reports in {}",
                job.id,
                job.duration().unwrap_or_default(),
                cfg.reports.display()
            );
            Ok(())
        }
        _ => anyhow::bail!(
            "KYC check {} failed: {}",
            job.id,
            job.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn show_config() -> Result<()> {
    let cfg = &config::reload_config()?;

    println!("kycflow configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Home:        {}", cfg.home.display());
    println!("Reports:     {}", cfg.reports.display());
    println!();
    println!("{}", serde_yaml::to_string(cfg).context("Failed to render configuration")?);
    println!("Secrets: {:?}", cfg.secrets);

    Ok(())
}
