//! Sanctions-matching source.
//!
//! Sends a structured `Person` query to an OpenSanctions-style match API.
//! Results are grouped per submitted query id; only results scoring above
//! the configured threshold are kept.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ensure_success, EvidenceSource};
use crate::config::SanctionsSettings;
use crate::domain::{Evidence, IdentityInfo, Match};

pub const SOURCE_NAME: &str = "sanctions";

/// Sanctions match client
pub struct SanctionsSource {
    url: String,
    api_key: Option<String>,
    score_threshold: f64,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    responses: std::collections::BTreeMap<String, QueryResponse>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MatchResult {
    score: f64,
    caption: String,
    #[serde(default)]
    datasets: Vec<String>,
    #[serde(default)]
    properties: ResultProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ResultProperties {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default, rename = "birthDate")]
    birth_date: Vec<String>,
    #[serde(default)]
    country: Vec<String>,
    #[serde(default)]
    nationality: Vec<String>,
}

impl SanctionsSource {
    pub fn new(settings: &SanctionsSettings, api_key: Option<String>) -> Self {
        Self {
            url: settings.url.clone(),
            api_key,
            score_threshold: settings.score_threshold,
            client: reqwest::Client::new(),
        }
    }

    /// Request body for one identity
    fn request_body(identity: &IdentityInfo) -> serde_json::Value {
        let mut properties = json!({
            "name": [identity.full_name],
            "birthDate": [identity.date_of_birth],
        });
        if let Some(ref code) = identity.nationality_code {
            properties["nationality"] = json!([code]);
        }

        json!({
            "queries": {
                "q1": {
                    "schema": "Person",
                    "properties": properties,
                }
            }
        })
    }
}

#[async_trait]
impl EvidenceSource for SanctionsSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn query(&self, identity: &IdentityInfo) -> Result<serde_json::Value> {
        debug!(url = %self.url, "Calling sanctions match");

        let mut request = self.client.post(&self.url).json(&Self::request_body(identity));
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", key);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach sanctions source")?;

        let response = ensure_success(response, "Sanctions match").await?;
        response
            .json()
            .await
            .context("Sanctions response is not valid JSON")
    }

    fn normalize(&self, payload: serde_json::Value) -> Result<Evidence> {
        let parsed: MatchResponse =
            serde_json::from_value(payload).context("Malformed sanctions response")?;

        let mut evidence = Evidence::default();

        for (query_id, query) in parsed.responses {
            for raw in query.results {
                let result: MatchResult = serde_json::from_value(raw.clone()).with_context(|| {
                    format!("Malformed sanctions result for query '{}'", query_id)
                })?;

                if result.score <= self.score_threshold {
                    continue;
                }

                let props = result.properties;
                evidence.matches.push(Match {
                    source: SOURCE_NAME.to_string(),
                    match_score: result.score,
                    matched_name: result.caption,
                    matched_date_of_birth: (!props.birth_date.is_empty())
                        .then(|| props.birth_date.join(", ")),
                    matched_countries: props.country,
                    matched_nationalities: props.nationality,
                    lists: result.datasets,
                    risk_category: props.topics.into_iter().next(),
                    details: raw,
                });
            }
        }

        debug!(matches = evidence.matches.len(), "Normalized sanctions payload");
        Ok(evidence)
    }
}
