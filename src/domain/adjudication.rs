//! Output of the reasoning stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Risk assessment levels, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// The most severe level, used when the reply does not state one we understand
    pub const MOST_SEVERE: RiskLevel = RiskLevel::Critical;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unrecognized risk level '{}'", other)),
        }
    }
}

/// Structured adjudication parsed from the reasoning service's reply.
///
/// Every text section is guaranteed non-empty by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationResult {
    pub risk_level: RiskLevel,

    /// Quality of the identity verification
    pub identity_verification: String,

    /// Judgement on the screening matches (confirmed, probable, false positive, ...)
    pub match_quality: String,

    pub screening_summary: String,

    /// Justification for the risk level
    pub risk_summary: String,

    /// Narrative summary of the key findings
    pub summary: String,

    pub recommendations: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_parsing_is_case_insensitive() {
        assert_eq!("HIGH".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!(" Low ".parse::<RiskLevel>(), Ok(RiskLevel::Low));
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::MOST_SEVERE, RiskLevel::Critical);
    }
}
