//! Persisted Media Store Port
//!
//! The ingest core produces [`MediaRecord`] documents and hands them to a
//! document store with vector search. Query semantics belong entirely to the
//! store implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Store-assigned document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media category stored in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Image,
    Audio,
    Pdf,
    Other,
}

/// Document persisted for every ingested file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub original_path: String,
    pub converted_path: Option<String>,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub matching: Vec<String>,
    pub embedding: Vec<f32>,
    pub processed: i64,
    pub content_hash: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Partial update applied by [`MediaStore::patch`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub matching: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
    pub processed: Option<i64>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.matching.is_none()
            && self.embedding.is_none()
            && self.processed.is_none()
    }
}

/// One hit of a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: RecordId,
    pub score: f32,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn insert(&self, record: MediaRecord) -> Result<RecordId>;

    async fn patch(&self, id: &RecordId, patch: RecordPatch) -> Result<()>;

    async fn delete(&self, id: &RecordId) -> Result<()>;

    async fn get(&self, id: &RecordId) -> Result<Option<MediaRecord>>;

    /// Fetch several records; missing ids are skipped
    async fn batch_get(&self, ids: &[RecordId]) -> Result<Vec<MediaRecord>>;

    /// Nearest neighbours by the `embedding` field
    async fn vector_search(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>>;

    /// Existing record with the given content hash, if any
    async fn find_by_digest(&self, digest: &str) -> Result<Option<RecordId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_record_wire_names() {
        let record = MediaRecord {
            record_type: RecordType::Image,
            original_path: "/in/a.heic".to_string(),
            converted_path: Some("db/media/a.avif".to_string()),
            title: "a".to_string(),
            description: String::new(),
            tags: vec![],
            matching: vec![],
            embedding: vec![],
            processed: 0,
            content_hash: "abc".to_string(),
            metadata: serde_json::Value::Null,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["originalPath"], "/in/a.heic");
        assert_eq!(json["convertedPath"], "db/media/a.avif");
        assert_eq!(json["contentHash"], "abc");
        assert_eq!(json["processed"], 0);
    }

    #[test]
    fn test_empty_patch() {
        assert!(RecordPatch::default().is_empty());
        let patch = RecordPatch {
            processed: Some(1),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
