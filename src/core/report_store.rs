//! Report rendering and persistence.
//!
//! Every completed report is written twice: `kyc_{id}.json` for machines and
//! `kyc_{id}.md` for people.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::domain::{IdentityInfo, MediaRiskLevel, Report};

/// Output formats for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unsupported report format '{}'", other)),
        }
    }
}

/// A report rendered in one format, ready to hand to a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub format: ReportFormat,
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ReportArtifact {
    pub fn render(report: &Report, format: ReportFormat) -> serde_json::Result<Self> {
        let body = match format {
            ReportFormat::Json => serde_json::to_string_pretty(report)?,
            ReportFormat::Markdown => render_markdown(report),
        };
        Ok(Self {
            format,
            file_name: report_file_name(&report.report_id, format),
            content_type: format.content_type(),
            body,
        })
    }
}

pub fn report_file_name(report_id: &str, format: ReportFormat) -> String {
    format!("kyc_{}.{}", report_id, format.extension())
}

fn identity_rows(identity: &IdentityInfo) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Full name", identity.full_name.clone()),
        ("Date of birth", identity.date_of_birth.clone()),
    ];
    let optional = [
        ("Nationality", &identity.nationality),
        ("Document type", &identity.document_type),
        ("Document number", &identity.document_number),
        ("Issuing country", &identity.issuing_country),
        ("Date of expiry", &identity.date_of_expiry),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            rows.push((label, value.clone()));
        }
    }
    rows
}

/// Human-readable report
pub fn render_markdown(report: &Report) -> String {
    let adjudication = &report.adjudication;
    let mut out = vec![
        format!("# KYC Report {}", report.report_id),
        String::new(),
        format!("Generated: {}", report.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        String::new(),
        format!("**Risk level: {}**", adjudication.risk_level.as_str().to_uppercase()),
        String::new(),
        "## Identity".to_string(),
        String::new(),
    ];

    for (label, value) in identity_rows(&report.identity) {
        out.push(format!("- {}: {}", label, value));
    }

    out.push(String::new());
    out.push(format!("## Screening Matches ({})", report.matches.len()));
    out.push(String::new());
    if report.matches.is_empty() {
        out.push("No matches.".to_string());
    } else {
        out.push("| Source | Name | Score | Lists | Category |".to_string());
        out.push("|---|---|---|---|---|".to_string());
        for m in &report.matches {
            out.push(format!(
                "| {} | {} | {:.2} | {} | {} |",
                m.source,
                m.matched_name,
                m.match_score,
                m.lists.join(", "),
                m.risk_category.as_deref().unwrap_or("-"),
            ));
        }
    }

    out.push(String::new());
    out.push(format!("## Adverse Media ({})", report.media.len()));
    out.push(String::new());
    if report.media.is_empty() {
        out.push("No adverse media.".to_string());
    } else {
        for finding in &report.media {
            out.push(format!(
                "- [{}] {} ({}, {}) <{}>",
                finding.category,
                finding.headline,
                finding.timestamp,
                media_risk_label(finding.risk_level),
                finding.source_link,
            ));
        }
    }

    let sections = [
        ("Identity Verification", &adjudication.identity_verification),
        ("Match Quality", &adjudication.match_quality),
        ("Screening Summary", &adjudication.screening_summary),
        ("Risk Summary", &adjudication.risk_summary),
        ("Summary", &adjudication.summary),
        ("Recommendations", &adjudication.recommendations),
    ];
    for (title, text) in sections {
        out.push(String::new());
        out.push(format!("## {}", title));
        out.push(String::new());
        out.push(text.clone());
    }

    out.push(String::new());
    out.join("\n")
}

fn media_risk_label(level: MediaRiskLevel) -> &'static str {
    match level {
        MediaRiskLevel::Medium => "medium risk",
        MediaRiskLevel::High => "high risk",
    }
}

/// Paths written for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

/// Writes reports under a single directory
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, report_id: &str, format: ReportFormat) -> PathBuf {
        self.dir.join(report_file_name(report_id, format))
    }

    async fn write(&self, report: &Report, format: ReportFormat) -> Result<PathBuf> {
        let artifact = ReportArtifact::render(report, format)?;
        let path = self.dir.join(&artifact.file_name);
        fs::write(&path, artifact.body)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    /// Write the JSON and Markdown renditions
    pub async fn save(&self, report: &Report) -> Result<SavedReport> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create reports directory: {}", self.dir.display()))?;

        let saved = SavedReport {
            json_path: self.write(report, ReportFormat::Json).await?,
            markdown_path: self.write(report, ReportFormat::Markdown).await?,
        };
        info!(
            report_id = %report.report_id,
            json = %saved.json_path.display(),
            "Report saved"
        );
        Ok(saved)
    }
}
