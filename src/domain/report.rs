//! The final KYC report handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::adjudication::AdjudicationResult;
use super::evidence::{Evidence, Match, MediaFinding};
use super::identity::IdentityInfo;

/// Immutable aggregate of identity, evidence and adjudication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Format: "{yyyymmdd}-{hhmmss}-{8 hex chars}"
    pub report_id: String,

    pub created_at: DateTime<Utc>,

    pub identity: IdentityInfo,

    pub matches: Vec<Match>,

    pub media: Vec<MediaFinding>,

    pub adjudication: AdjudicationResult,
}

impl Report {
    /// Assemble a report, generating its id and creation timestamp
    pub fn assemble(
        identity: IdentityInfo,
        evidence: Evidence,
        adjudication: AdjudicationResult,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            report_id: generate_report_id(created_at),
            created_at,
            identity,
            matches: evidence.matches,
            media: evidence.media,
            adjudication,
        }
    }
}

/// Timestamp-prefixed id, suffixed so two reports in the same second never collide
pub fn generate_report_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", at.format("%Y%m%d-%H%M%S"), &suffix[..8])
}
