//! kycflow - KYC evidence aggregation and adjudication orchestrator
//!
//! Given an identity document, kycflow extracts the identity, gathers
//! evidence from several screening sources at once, submits that evidence to
//! an asynchronous reasoning service for adjudication, and tracks the whole
//! submission as a job with a visible lifecycle.
//!
//! # Modules
//!
//! - `adapters`: External systems (screening sources, reasoning service,
//!   identity extraction, notifications)
//! - `core`: Orchestration (aggregation, analysis monitor, parser, jobs)
//! - `domain`: Data structures (IdentityInfo, Match, Report, Job)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Check a document and print the Markdown report
//! kycflow check passport.jpg
//!
//! # JSON report, with a completion callback
//! kycflow check passport.jpg --format json --callback-url https://example.com/hook
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::{AnalysisJobMonitor, EvidenceAggregator, JobManager, JobRegistry, ReportFormat};
pub use domain::{AdjudicationResult, IdentityInfo, Job, JobError, JobStatus, Match, MediaFinding, Report, RiskLevel};
