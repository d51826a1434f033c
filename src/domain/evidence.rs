//! Canonical evidence records produced by the screening sources.
//!
//! Every source maps its own payload into these shapes so the rest of the
//! pipeline never branches on source name.

use serde::{Deserialize, Serialize};

/// Adverse-media categories that are always treated as high risk
pub const HIGH_SEVERITY_CATEGORIES: &[&str] = &["terrorism", "financial_crime", "organized_crime"];

/// A potential hit against a watchlist or sanctions list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Name of the source that produced the hit
    pub source: String,

    /// Similarity reported by the source (0.0-1.0, comparable within one source only)
    pub match_score: f64,

    pub matched_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_date_of_birth: Option<String>,

    #[serde(default)]
    pub matched_countries: Vec<String>,

    #[serde(default)]
    pub matched_nationalities: Vec<String>,

    /// Lists or datasets the hit originated from
    #[serde(default)]
    pub lists: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_category: Option<String>,

    /// Raw source fields, kept verbatim for audit
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Coarse risk of a single media article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaRiskLevel {
    Medium,
    High,
}

impl MediaRiskLevel {
    /// Classify an adverse-media category
    pub fn for_category(category: &str) -> Self {
        if HIGH_SEVERITY_CATEGORIES.contains(&category) {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// One adverse-media article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFinding {
    pub category: String,
    pub timestamp: String,
    pub headline: String,
    pub body: String,
    pub source_link: String,
    pub risk_level: MediaRiskLevel,
}

impl MediaFinding {
    /// Build a finding, deriving the risk level from the category
    pub fn new(
        category: impl Into<String>,
        timestamp: impl Into<String>,
        headline: impl Into<String>,
        body: impl Into<String>,
        source_link: impl Into<String>,
    ) -> Self {
        let category = category.into();
        let risk_level = MediaRiskLevel::for_category(&category);
        Self {
            category,
            timestamp: timestamp.into(),
            headline: headline.into(),
            body: body.into(),
            source_link: source_link.into(),
            risk_level,
        }
    }
}

/// Everything gathered for one identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub matches: Vec<Match>,
    pub media: Vec<MediaFinding>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.media.is_empty()
    }

    /// Append another batch, preserving order
    pub fn extend(&mut self, other: Evidence) {
        self.matches.extend(other.matches);
        self.media.extend(other.media);
    }
}
