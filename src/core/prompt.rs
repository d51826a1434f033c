//! Text handed to the reasoning service.
//!
//! The label list in `ANALYSIS_INSTRUCTIONS` must stay in sync with the
//! parser's grammar in `parser.rs`.

use serde_json::{json, Value};

use crate::domain::{IdentityInfo, Match, MediaFinding};

pub const TOOL_GET_IDENTITY: &str = "get_identity";
pub const TOOL_GET_COMPLIANCE_MATCHES: &str = "get_compliance_matches";
pub const TOOL_GET_ADVERSE_MEDIA: &str = "get_adverse_media";

/// Standing instructions for the analyst assistant
pub const ANALYST_PERSONA: &str = "\
You are an expert KYC compliance analyst with deep experience in risk assessment \
and regulatory compliance. You analyze identity documents, compliance screening \
results and adverse media findings to decide on customer risk.

Identity analysis: evaluate completeness of the identity information and flag \
discrepancies. Consider the reliability and jurisdiction of the issuing document.

Screening analysis: weigh name similarity, supporting identifiers such as date of \
birth and nationality, source quality and severity of listings. Decide between \
confirmed, probable and possible matches, false positives and items needing \
further investigation.

Adverse media: assess credibility, relevance, severity and timing of findings \
and connect patterns across sources.

Explain your reasoning, state your confidence, and highlight uncertainty. The \
identity, matches and media findings are also available through the provided \
tools.";

/// Per-run instructions fixing the labeled response format
pub const ANALYSIS_INSTRUCTIONS: &str = "\
Analyze the provided KYC findings sourced from KYC/AML/CFT services and determine:
1. Quality of identity verification
2. Quality of the screening matches: confirmed, probable or possible matches, \
false positives, false negatives, or items needing further investigation
3. Overall risk level (LOW/MEDIUM/HIGH/CRITICAL)
4. Detailed risk justification
5. Specific recommendations

Format the response exactly as below. Each label starts its own line and each \
section appears once. Do not repeat content from one section in another.

IDENTITY_VERIFICATION: [quality of identity verification]

MATCH_QUALITY: [assessment of each screening match]

RISK_LEVEL: [LOW, MEDIUM, HIGH or CRITICAL]

SCREENING_SUMMARY: [what the screening sources returned]

RISK_SUMMARY: [justification of the risk level]

SUMMARY: [overall narrative of the key findings]

RECOMMENDATIONS: [specific action items]";

/// User message carrying the evidence bundle
pub fn build_analysis_prompt(
    identity: &IdentityInfo,
    matches: &[Match],
    media: &[MediaFinding],
) -> serde_json::Result<String> {
    let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".to_string());

    Ok(format!(
        "Please analyze the following KYC findings:

Subject Information:
- Name: {name}
- Date of Birth: {dob}
- Nationality: {nationality}
- Document Type: {document_type}

Compliance Matches: {matches}

Adverse Media Findings: {media}

Format your response according to the run instructions. Keep every section \
distinct and do not duplicate content across sections.",
        name = identity.full_name,
        dob = identity.date_of_birth,
        nationality = or_unknown(&identity.nationality),
        document_type = or_unknown(&identity.document_type),
        matches = serde_json::to_string_pretty(matches)?,
        media = serde_json::to_string_pretty(media)?,
    ))
}

fn function_tool(name: &str, description: &str) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {"type": "object", "properties": {}, "required": []},
        }
    })
}

/// Function tools registered on the analyst assistant
pub fn tool_definitions() -> Value {
    json!([
        function_tool(TOOL_GET_IDENTITY, "Identity attributes extracted from the document"),
        function_tool(TOOL_GET_COMPLIANCE_MATCHES, "Watchlist and sanctions matches"),
        function_tool(TOOL_GET_ADVERSE_MEDIA, "Adverse media findings"),
    ])
}
