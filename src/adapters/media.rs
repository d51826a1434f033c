//! Adverse-media source.
//!
//! Searches a Dilisense-style news screening endpoint by full name with
//! article bodies included. Findings are grouped by category; every article
//! in a category with hits becomes one MediaFinding.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ensure_success, EvidenceSource};
use crate::config::MediaSettings;
use crate::domain::{Evidence, IdentityInfo, MediaFinding};

pub const SOURCE_NAME: &str = "adverse_media";

/// Adverse-media search client
pub struct MediaSource {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    news_exposures: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CategoryExposure {
    #[serde(default)]
    hits: u64,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    timestamp: String,
    headline: String,
    #[serde(default)]
    body: String,
    source_link: String,
}

impl MediaSource {
    pub fn new(settings: &MediaSettings, api_key: Option<String>) -> Self {
        Self {
            url: settings.url.clone(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EvidenceSource for MediaSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn query(&self, identity: &IdentityInfo) -> Result<serde_json::Value> {
        debug!(url = %self.url, "Calling adverse media search");

        let mut request = self.client.get(&self.url).query(&[
            ("search_all", identity.full_name.as_str()),
            ("fetch_articles", "true"),
        ]);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach adverse media source")?;

        let response = ensure_success(response, "Adverse media search").await?;
        response
            .json()
            .await
            .context("Adverse media response is not valid JSON")
    }

    fn normalize(&self, payload: serde_json::Value) -> Result<Evidence> {
        let parsed: MediaResponse =
            serde_json::from_value(payload).context("Malformed adverse media response")?;

        let mut evidence = Evidence::default();

        for (category, exposure) in parsed.news_exposures {
            // Only category objects carry articles
            if !exposure.is_object() {
                continue;
            }

            let exposure: CategoryExposure = serde_json::from_value(exposure)
                .with_context(|| format!("Malformed adverse media category '{}'", category))?;

            if exposure.hits == 0 {
                continue;
            }

            for article in exposure.articles {
                evidence.media.push(MediaFinding::new(
                    category.clone(),
                    article.timestamp,
                    article.headline,
                    article.body,
                    article.source_link,
                ));
            }
        }

        debug!(articles = evidence.media.len(), "Normalized adverse media payload");
        Ok(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaRiskLevel;
    use serde_json::json;

    fn source() -> MediaSource {
        MediaSource::new(&MediaSettings::default(), None)
    }

    fn article(headline: &str) -> serde_json::Value {
        json!({
            "timestamp": "2024-06-01T10:00:00Z",
            "headline": headline,
            "body": "Full article text",
            "source_link": "https://news.example/a"
        })
    }

    #[test]
    fn test_one_finding_per_article() {
        let payload = json!({
            "total_hits": 3,
            "news_exposures": {
                "terrorism": {"hits": 1, "articles": [article("Charged")]},
                "cybercrime": {"hits": 2, "articles": [article("Breach"), article("Leak")]},
                "fraud": {"hits": 0, "articles": [article("Ignored")]}
            }
        });

        let evidence = source().normalize(payload).unwrap();

        assert!(evidence.matches.is_empty());
        assert_eq!(evidence.media.len(), 3);

        let terrorism: Vec<_> = evidence
            .media
            .iter()
            .filter(|m| m.category == "terrorism")
            .collect();
        assert_eq!(terrorism.len(), 1);
        assert_eq!(terrorism[0].risk_level, MediaRiskLevel::High);

        assert!(evidence
            .media
            .iter()
            .filter(|m| m.category == "cybercrime")
            .all(|m| m.risk_level == MediaRiskLevel::Medium));
        assert!(evidence.media.iter().all(|m| m.headline != "Ignored"));
    }

    #[test]
    fn test_no_exposures() {
        let payload = json!({"total_hits": 0, "news_exposures": {}});
        assert!(source().normalize(payload).unwrap().is_empty());
    }

    #[test]
    fn test_article_without_link_is_malformed() {
        let payload = json!({
            "news_exposures": {
                "fraud": {"hits": 1, "articles": [{"timestamp": "t", "headline": "h"}]}
            }
        });
        assert!(source().normalize(payload).is_err());
    }
}
