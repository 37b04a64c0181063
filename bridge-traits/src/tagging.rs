//! AI Tagging Port
//!
//! Description, tagging and embedding are delegated to an external,
//! rate-limited service. The core only invokes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Suggestions returned for one media file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub title: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub matching: Vec<String>,
}

#[async_trait]
pub trait Tagger: Send + Sync {
    /// Describe and tag the media at `path`
    ///
    /// Rate-limit responses must surface as `BridgeError::RateLimited` so the
    /// caller's retry policy can back off.
    async fn describe(&self, path: &Path) -> Result<TagSuggestion>;

    /// Embed a text into the store's vector space
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
