//! AI enrichment hand-off
//!
//! Asks the injected [`Tagger`] for a description, tags and an embedding of a
//! stored record and patches the result into the [`MediaStore`]. The tagger
//! is rate limited; calls go through the configured [`RetryPolicy`] and only
//! `RateLimited` responses are retried.

use bridge_traits::error::BridgeError;
use bridge_traits::{MediaRecord, MediaStore, RecordId, RecordPatch, Tagger};
use core_runtime::config::IngestConfig;
use core_runtime::retry::RetryPolicy;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// Retry predicate for tagger calls
pub fn is_rate_limited(error: &BridgeError) -> bool {
    matches!(error, BridgeError::RateLimited { .. })
}

pub struct Enricher {
    tagger: Arc<dyn Tagger>,
    store: Arc<dyn MediaStore>,
    retry_policy: RetryPolicy,
}

impl Enricher {
    pub fn new(tagger: Arc<dyn Tagger>, store: Arc<dyn MediaStore>, retry_policy: RetryPolicy) -> Self {
        Self {
            tagger,
            store,
            retry_policy,
        }
    }

    /// # Errors
    ///
    /// `MissingCollaborator` when the config has no tagger or no store.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let tagger = config
            .tagger
            .clone()
            .ok_or(IngestError::MissingCollaborator("tagger"))?;
        let store = config
            .media_store
            .clone()
            .ok_or(IngestError::MissingCollaborator("media store"))?;
        Ok(Self::new(tagger, store, config.retry_policy))
    }

    /// Describe, tag and embed `record`, then patch the stored copy.
    ///
    /// The rendition is described when there is one, else the original.
    /// `record` is updated in place to match what was written.
    pub async fn enrich(&self, id: &RecordId, record: &mut MediaRecord) -> Result<()> {
        let target = record
            .converted_path
            .clone()
            .unwrap_or_else(|| record.original_path.clone());
        let target = Path::new(&target);
        let tagger = &self.tagger;

        let suggestion = self
            .retry_policy
            .run("tagger.describe", is_rate_limited, || tagger.describe(target))
            .await?;

        if let Some(title) = suggestion.title.filter(|t| !t.trim().is_empty()) {
            record.title = title;
        }
        record.description = suggestion.description;
        record.tags = suggestion.tags;
        record.matching = suggestion.matching;

        let text = embedding_text(record);
        let embedding = self
            .retry_policy
            .run("tagger.embed", is_rate_limited, || tagger.embed(&text))
            .await?;
        debug!(id = %id, dimensions = embedding.len(), "Embedding computed");

        record.embedding = embedding;
        record.processed += 1;

        let patch = RecordPatch {
            title: Some(record.title.clone()),
            description: Some(record.description.clone()),
            tags: Some(record.tags.clone()),
            matching: Some(record.matching.clone()),
            embedding: Some(record.embedding.clone()),
            processed: Some(record.processed),
        };
        self.store.patch(id, patch).await?;

        info!(id = %id, tags = record.tags.len(), "Record enriched");
        Ok(())
    }
}

/// Text embedded for similarity search
fn embedding_text(record: &MediaRecord) -> String {
    let mut parts = vec![record.title.as_str(), record.description.as_str()];
    parts.extend(record.tags.iter().map(String::as_str));
    parts.extend(record.matching.iter().map(String::as_str));
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
