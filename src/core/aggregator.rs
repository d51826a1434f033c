//! Concurrent evidence fan-out / fan-in.
//!
//! Every configured source is queried at once for the same identity. The
//! join is all-or-nothing: the first failure aborts the remaining calls and
//! fails the aggregation, so callers never see a partial result.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::adapters::EvidenceSource;
use crate::domain::{Evidence, IdentityInfo};

/// Fans one identity out to a fixed set of evidence sources
#[derive(Clone)]
pub struct EvidenceAggregator {
    sources: Vec<Arc<dyn EvidenceSource>>,
}

/// Query one source and normalize its payload
async fn collect(source: &dyn EvidenceSource, identity: &IdentityInfo) -> Result<Evidence> {
    let payload = source.query(identity).await?;
    debug!(source = source.name(), "Received source payload");
    source.normalize(payload)
}

impl EvidenceAggregator {
    pub fn new(sources: Vec<Arc<dyn EvidenceSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Gather evidence from every source, in source order
    #[instrument(skip_all, fields(sources = self.sources.len()))]
    pub async fn aggregate(&self, identity: &IdentityInfo) -> Result<Evidence> {
        let identity = Arc::new(identity.clone());
        let mut tasks = JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let identity = Arc::clone(&identity);
            tasks.spawn(async move {
                let result = collect(source.as_ref(), &identity)
                    .await
                    .with_context(|| format!("Evidence source '{}' failed", source.name()));
                (index, result)
            });
        }

        let mut collected: Vec<Option<Evidence>> = self.sources.iter().map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    tasks.abort_all();
                    error!(error = %join_error, "Evidence task did not finish");
                    return Err(anyhow!("Evidence source task failed: {}", join_error));
                }
            };

            match result {
                Ok(evidence) => collected[index] = Some(evidence),
                Err(e) => {
                    tasks.abort_all();
                    error!(error = %format!("{:#}", e), "Evidence aggregation failed");
                    return Err(e);
                }
            }
        }

        let mut evidence = Evidence::default();
        for part in collected.into_iter().flatten() {
            evidence.extend(part);
        }

        info!(
            matches = evidence.matches.len(),
            media = evidence.media.len(),
            "Evidence aggregated"
        );
        Ok(evidence)
    }
}
