//! Core orchestration logic.
//!
//! This module contains:
//! - EvidenceAggregator: concurrent fan-out to the evidence sources
//! - AnalysisJobMonitor: polling state machine for remote analysis jobs
//! - parser: labeled-section reply parser
//! - JobRegistry / JobManager: per-submission lifecycle
//! - ReportStore: report rendering and persistence

pub mod aggregator;
pub mod lifecycle;
pub mod monitor;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod report_store;

// Re-export commonly used types
pub use aggregator::EvidenceAggregator;
pub use lifecycle::JobManager;
pub use monitor::{
    is_rate_limited, next_action, AnalysisError, AnalysisJobMonitor, MonitorSettings, PollAction,
    ToolOutputs,
};
pub use parser::{parse, ParseError, Section};
pub use registry::JobRegistry;
pub use report_store::{render_markdown, ReportArtifact, ReportFormat, ReportStore, SavedReport};
