//! Response Parser Integration Tests
//!
//! Replies as the reasoning service actually writes them: decorated,
//! chatty, sometimes incomplete.

mod common;

use tokio_test::{assert_err, assert_ok};

use common::full_reply;
use kycflow::core::{parse, ParseError, Section};
use kycflow::domain::RiskLevel;

#[test]
fn test_complete_reply_parses_every_section() {
    let result = assert_ok!(parse(&full_reply("HIGH")));

    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(
        result.identity_verification,
        "Passport data is complete and consistent."
    );
    assert_eq!(
        result.match_quality,
        "One probable watchlist match on name and date of birth."
    );
    assert!(result.screening_summary.starts_with("Watchlist returned"));
    assert!(!result.risk_summary.is_empty());
    assert_eq!(result.summary, "Subject is probably the listed individual.");
    assert_eq!(result.recommendations, "Escalate to enhanced due diligence.");
}

#[test]
fn test_keywords_inside_body_text_do_not_split_sections() {
    let reply = "\
IDENTITY_VERIFICATION: Verified.
MATCH_QUALITY: Weak. See the SUMMARY: below for context.
RISK_LEVEL: low
SCREENING_SUMMARY: Nothing found.
RISK_SUMMARY: Low exposure.
recommendations: this lower-case line is body text
SUMMARY: Clean profile.
RECOMMENDATIONS: Approve.";

    let result = parse(reply).unwrap();

    assert_eq!(
        result.match_quality,
        "Weak. See the SUMMARY: below for context."
    );
    assert_eq!(
        result.risk_summary,
        "Low exposure.\nrecommendations: this lower-case line is body text"
    );
    assert_eq!(result.summary, "Clean profile.");
    assert_eq!(result.recommendations, "Approve.");
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn test_every_missing_section_is_named() {
    let err = assert_err!(parse("RISK_LEVEL: LOW\nMATCH_QUALITY: none\nSUMMARY: fine"));

    assert_eq!(
        err,
        ParseError::MissingSections(vec![
            Section::IdentityVerification,
            Section::ScreeningSummary,
            Section::RiskSummary,
            Section::Recommendations,
        ])
    );
}

#[test]
fn test_empty_section_counts_as_missing() {
    let reply = full_reply("LOW").replace(
        "RECOMMENDATIONS: Escalate to enhanced due diligence.",
        "RECOMMENDATIONS:   ",
    );

    let err = parse(&reply).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingSections(vec![Section::Recommendations])
    );
}

#[test]
fn test_missing_risk_level_defaults_to_most_severe() {
    let reply = full_reply("LOW").replace("RISK_LEVEL: LOW", "");
    let result = parse(&reply).unwrap();
    assert_eq!(result.risk_level, RiskLevel::Critical);
}

#[test]
fn test_unknown_risk_token_defaults_to_most_severe() {
    let result = parse(&full_reply("ELEVATED")).unwrap();
    assert_eq!(result.risk_level, RiskLevel::Critical);
}

#[test]
fn test_risk_token_is_case_insensitive_and_keeps_only_first_word() {
    let result = parse(&full_reply("Medium - driven by media exposure")).unwrap();
    assert_eq!(result.risk_level, RiskLevel::Medium);
}

#[test]
fn test_compound_risk_token_reads_its_first_level() {
    let high = assert_ok!(parse(&full_reply("High-risk due to the sanctions listing")));
    assert_eq!(high.risk_level, RiskLevel::High);

    let medium = assert_ok!(parse(&full_reply("Medium/High")));
    assert_eq!(medium.risk_level, RiskLevel::Medium);
}

#[test]
fn test_markdown_decorated_labels() {
    let reply = "\
## IDENTITY_VERIFICATION:
Document checks passed.

**MATCH_QUALITY:** No matches.
- **RISK_LEVEL**: LOW
### SCREENING_SUMMARY: All sources clear.
  RISK_SUMMARY: Minimal.
**SUMMARY**: Clean.
RECOMMENDATIONS: Approve onboarding.";

    let result = parse(reply).unwrap();

    assert_eq!(result.identity_verification, "Document checks passed.");
    assert_eq!(result.match_quality, "No matches.");
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.screening_summary, "All sources clear.");
    assert_eq!(result.risk_summary, "Minimal.");
    assert_eq!(result.summary, "Clean.");
}

#[test]
fn test_first_occurrence_of_a_repeated_label_wins() {
    let reply = format!(
        "{}\n\nSUMMARY: A second summary that should be ignored.\nStill ignored.",
        full_reply("LOW")
    );

    let result = parse(&reply).unwrap();

    assert_eq!(result.summary, "Subject is probably the listed individual.");
    assert_eq!(result.recommendations, "Escalate to enhanced due diligence.");
}

#[test]
fn test_text_before_first_label_is_ignored() {
    let result = parse(&full_reply("LOW")).unwrap();
    assert!(!result.identity_verification.contains("Here is my assessment"));
}
