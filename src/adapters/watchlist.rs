//! Watchlist search source.
//!
//! Queries a Watchman-style search endpoint by name and country. The
//! response is a map of list category to hits; each hit becomes one Match
//! tagged with its category.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ensure_success, EvidenceSource};
use crate::config::WatchlistSettings;
use crate::domain::{Evidence, IdentityInfo, Match};

pub const SOURCE_NAME: &str = "watchlist";

/// Watchlist search client
pub struct WatchlistSource {
    url: String,
    min_match: f64,
    limit: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WatchlistHit {
    #[serde(default, rename = "match")]
    score: Option<f64>,
    #[serde(default, rename = "matchedName")]
    matched_name: Option<String>,
    #[serde(default, rename = "DatesOfBirth")]
    dates_of_birth: serde_json::Value,
    #[serde(default, rename = "Countries")]
    countries: Option<Vec<String>>,
    #[serde(default, rename = "Nationalities")]
    nationalities: Option<Vec<String>>,
}

impl WatchlistSource {
    pub fn new(settings: &WatchlistSettings) -> Self {
        Self {
            url: settings.url.clone(),
            min_match: settings.min_match,
            limit: settings.limit,
            client: reqwest::Client::new(),
        }
    }

    /// Query string sent to the search endpoint
    fn query_params(&self, identity: &IdentityInfo) -> Vec<(&'static str, String)> {
        let mut params = vec![("name", identity.full_name.clone())];
        if let Some(ref country) = identity.nationality {
            params.push(("country", country.clone()));
        }
        params.push(("minMatch", self.min_match.to_string()));
        params.push(("limit", self.limit.to_string()));
        params
    }
}

#[async_trait]
impl EvidenceSource for WatchlistSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn query(&self, identity: &IdentityInfo) -> Result<serde_json::Value> {
        debug!(url = %self.url, "Calling watchlist search");

        let response = self
            .client
            .get(&self.url)
            .query(&self.query_params(identity))
            .send()
            .await
            .context("Failed to reach watchlist source")?;

        let response = ensure_success(response, "Watchlist search").await?;
        response
            .json()
            .await
            .context("Watchlist response is not valid JSON")
    }

    fn normalize(&self, payload: serde_json::Value) -> Result<Evidence> {
        let categories = match payload {
            serde_json::Value::Object(map) => map,
            other => anyhow::bail!("Watchlist payload is not an object: {}", other),
        };

        let mut evidence = Evidence::default();

        for (category, items) in categories {
            // Non-list entries (counts, refresh dates, nulls) carry no hits
            let serde_json::Value::Array(items) = items else {
                continue;
            };

            for item in items {
                let hit: WatchlistHit = serde_json::from_value(item.clone()).with_context(|| {
                    format!("Malformed watchlist hit in category '{}'", category)
                })?;

                evidence.matches.push(Match {
                    source: SOURCE_NAME.to_string(),
                    match_score: hit.score.unwrap_or_default(),
                    matched_name: hit.matched_name.unwrap_or_default(),
                    matched_date_of_birth: text_or_list(&hit.dates_of_birth),
                    matched_countries: hit.countries.unwrap_or_default(),
                    matched_nationalities: hit.nationalities.unwrap_or_default(),
                    lists: vec![category.clone()],
                    risk_category: Some(category.clone()),
                    details: item,
                });
            }
        }

        debug!(matches = evidence.matches.len(), "Normalized watchlist payload");
        Ok(evidence)
    }
}

/// Dates arrive either as a single string or a list of strings
fn text_or_list(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}
