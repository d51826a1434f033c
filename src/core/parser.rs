//! Parser for the reasoning service's labeled reply.
//!
//! A section starts at a line beginning with an upper-case label followed by
//! a colon. Leading whitespace and Markdown decoration (`#`, `*`, `-`, `_`)
//! before the label are tolerated, as is `**` around it. Body text that
//! mentions a label mid-line never starts a new section.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::domain::{AdjudicationResult, RiskLevel};

/// Labeled sections of an analysis reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    IdentityVerification,
    MatchQuality,
    RiskLevel,
    ScreeningSummary,
    RiskSummary,
    Summary,
    Recommendations,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityVerification => "IDENTITY_VERIFICATION",
            Self::MatchQuality => "MATCH_QUALITY",
            Self::RiskLevel => "RISK_LEVEL",
            Self::ScreeningSummary => "SCREENING_SUMMARY",
            Self::RiskSummary => "RISK_SUMMARY",
            Self::Summary => "SUMMARY",
            Self::Recommendations => "RECOMMENDATIONS",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every recognized label, in reply order
pub const LABELS: [Section; 7] = [
    Section::IdentityVerification,
    Section::MatchQuality,
    Section::RiskLevel,
    Section::ScreeningSummary,
    Section::RiskSummary,
    Section::Summary,
    Section::Recommendations,
];

/// Sections that must carry non-empty text
pub const REQUIRED_SECTIONS: [Section; 6] = [
    Section::IdentityVerification,
    Section::MatchQuality,
    Section::ScreeningSummary,
    Section::RiskSummary,
    Section::Summary,
    Section::Recommendations,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Analysis reply is missing required sections: {}", join_sections(.0))]
    MissingSections(Vec<Section>),
}

fn join_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(Section::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// If `line` opens a section, return its label and the text after the colon
fn label_line(line: &str) -> Option<(Section, &str)> {
    let stripped =
        line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '#' | '*' | '-' | '_'));

    LABELS.iter().find_map(|&section| {
        let rest = stripped.strip_prefix(section.as_str())?;
        let rest = rest.trim_start_matches('*').trim_start();
        let body = rest.strip_prefix(':')?;
        Some((section, body.trim_start_matches('*')))
    })
}

/// Split a reply into sections; the first occurrence of a repeated label wins
fn split_sections(raw: &str) -> HashMap<Section, String> {
    let mut sections: HashMap<Section, Vec<&str>> = HashMap::new();
    // None while before the first label or inside a repeated one
    let mut current: Option<Section> = None;

    for line in raw.lines() {
        if let Some((section, body)) = label_line(line) {
            if sections.contains_key(&section) {
                current = None;
            } else {
                sections.insert(section, vec![body]);
                current = Some(section);
            }
            continue;
        }

        if let Some(section) = current {
            if let Some(lines) = sections.get_mut(&section) {
                lines.push(line);
            }
        }
    }

    sections
        .into_iter()
        .map(|(section, lines)| (section, lines.join("\n").trim().to_string()))
        .collect()
}

/// Leading run of letters in the risk section, matched case-insensitively.
/// `**High**.` and `High-risk` both read as high.
fn parse_risk_level(section: Option<&String>) -> RiskLevel {
    let token: Option<String> = section
        .and_then(|text| text.split_whitespace().next())
        .and_then(|word| {
            word.trim_start_matches(|c: char| !c.is_alphabetic())
                .split(|c: char| !c.is_alphabetic())
                .next()
        })
        .filter(|token| !token.is_empty())
        .map(String::from);

    match token.as_deref().map(str::parse::<RiskLevel>) {
        Some(Ok(level)) => level,
        Some(Err(_)) => {
            warn!(
                token = token.as_deref().unwrap_or_default(),
                "Unrecognized risk level, defaulting to {}",
                RiskLevel::MOST_SEVERE
            );
            RiskLevel::MOST_SEVERE
        }
        None => {
            warn!("Reply has no risk level, defaulting to {}", RiskLevel::MOST_SEVERE);
            RiskLevel::MOST_SEVERE
        }
    }
}

/// Parse a reply into an AdjudicationResult, naming every missing section
pub fn parse(raw: &str) -> Result<AdjudicationResult, ParseError> {
    let mut sections = split_sections(raw);

    let missing: Vec<Section> = REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|s| sections.get(s).map_or(true, |text| text.is_empty()))
        .collect();

    if !missing.is_empty() {
        return Err(ParseError::MissingSections(missing));
    }

    let risk_level = parse_risk_level(sections.get(&Section::RiskLevel));
    let mut take = |section: Section| sections.remove(&section).unwrap_or_default();

    Ok(AdjudicationResult {
        risk_level,
        identity_verification: take(Section::IdentityVerification),
        match_quality: take(Section::MatchQuality),
        screening_summary: take(Section::ScreeningSummary),
        risk_summary: take(Section::RiskSummary),
        summary: take(Section::Summary),
        recommendations: take(Section::Recommendations),
    })
}
