//! Domain types for the kycflow orchestrator.
//!
//! This module contains the core data structures:
//! - Document: the uploaded file
//! - Identity: attributes extracted from the submitted document
//! - Evidence: canonical matches and adverse-media findings
//! - Adjudication: risk level and narrative from the reasoning stage
//! - Report: the immutable result handed back to callers
//! - Job: per-submission lifecycle state

pub mod adjudication;
pub mod document;
pub mod evidence;
pub mod identity;
pub mod job;
pub mod report;

// Re-export commonly used types
pub use adjudication::{AdjudicationResult, RiskLevel};
pub use document::Document;
pub use evidence::{Evidence, Match, MediaFinding, MediaRiskLevel, HIGH_SEVERITY_CATEGORIES};
pub use identity::{DocumentType, IdentityInfo};
pub use job::{DeliveryStatus, Job, JobError, JobStatus, MetadataEntry, NotificationTargets};
pub use report::{generate_report_id, Report};
