//! Identity extraction client.
//!
//! Uploads the document as multipart form data and maps the JSON reply onto
//! IdentityInfo. Only `full_name` and `date_of_birth` are required.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::{ensure_success, IdentityExtractor};
use crate::domain::{Document, IdentityInfo};

/// HTTP identity extraction client
pub struct HttpIdentityExtractor {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpIdentityExtractor {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

/// Map the extractor's reply onto IdentityInfo, rejecting blank required fields
pub fn parse_identity(payload: serde_json::Value) -> Result<IdentityInfo> {
    let identity: IdentityInfo = serde_json::from_value(payload)
        .context("Identity extraction response is missing required fields")?;

    if identity.full_name.trim().is_empty() {
        anyhow::bail!("Identity extraction returned an empty full_name");
    }
    if identity.date_of_birth.trim().is_empty() {
        anyhow::bail!("Identity extraction returned an empty date_of_birth");
    }

    Ok(identity)
}

#[async_trait]
impl IdentityExtractor for HttpIdentityExtractor {
    async fn extract(&self, document: &Document) -> Result<IdentityInfo> {
        debug!(url = %self.url, file = %document.file_name, "Sending document for extraction");

        let part = Part::bytes(document.bytes.clone()).file_name(document.file_name.clone());
        let form = Form::new().part("image", part);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .context("Failed to reach identity extraction service")?;

        let response = ensure_success(response, "Identity extraction").await?;
        let payload: serde_json::Value = response
            .json()
            .await
            .context("Identity extraction response is not valid JSON")?;

        let identity = parse_identity(payload)?;
        info!(document_type = ?identity.known_document_type(), "Extracted identity");
        Ok(identity)
    }
}
