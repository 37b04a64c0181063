//! Batch outcome types

use core_library::{ContentDigest, MediaKind};
use core_metadata::FlatMetadata;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One successfully ingested file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    /// Source file as found by the scanner
    pub original_path: PathBuf,
    /// Verified copy inside managed storage
    pub managed_path: PathBuf,
    /// Stored rendition, when the format has one
    pub converted_path: Option<PathBuf>,
    /// Kind of the stored content, from the sniffed type when known
    pub kind: MediaKind,
    pub metadata: FlatMetadata,
    pub content_digest: ContentDigest,
    /// Times the file went through downstream processing
    pub processed: u32,
}

impl IngestResult {
    pub fn mark_processed(&mut self) {
        self.processed = self.processed.saturating_add(1);
    }

    /// Base name used as the default record title
    pub fn title(&self) -> String {
        self.original_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pipeline step a file failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Hash,
    Copy,
    Convert,
    Extract,
    /// The worker task itself died
    Task,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureStage::Hash => "hash",
            FailureStage::Copy => "copy",
            FailureStage::Convert => "convert",
            FailureStage::Extract => "extract",
            FailureStage::Task => "task",
        };
        f.write_str(label)
    }
}

/// A file that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

/// Why a file was not processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SkipReason {
    /// Same content as an earlier file of this run
    DuplicateInRun { first_seen: PathBuf },
    /// Same content as a record already in the media store
    KnownToStore { record_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: PathBuf,
    pub content_digest: ContentDigest,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything one run produced, each list in scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub results: Vec<IngestResult>,
    pub skipped: Vec<SkippedFile>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    /// Files the scanner handed to the pipeline
    pub fn total(&self) -> usize {
        self.results.len() + self.skipped.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::hash_bytes;

    fn result(path: &str) -> IngestResult {
        IngestResult {
            original_path: PathBuf::from(path),
            managed_path: PathBuf::from("db/media/x.png"),
            converted_path: None,
            kind: MediaKind::Image,
            metadata: FlatMetadata::new(),
            content_digest: hash_bytes(b"x"),
            processed: 0,
        }
    }

    #[test]
    fn test_title_is_file_stem() {
        assert_eq!(result("/in/holiday.photo.jpg").title(), "holiday.photo");
        assert_eq!(result("/").title(), "");
    }

    #[test]
    fn test_mark_processed_increments() {
        let mut r = result("/in/a.png");
        r.mark_processed();
        r.mark_processed();
        assert_eq!(r.processed, 2);
    }

    #[test]
    fn test_skip_serializes_with_reason_tag() {
        let skipped = SkippedFile {
            path: PathBuf::from("/in/b.png"),
            content_digest: hash_bytes(b"x"),
            reason: SkipReason::DuplicateInRun {
                first_seen: PathBuf::from("/in/a.png"),
            },
        };

        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"], "duplicateInRun");
        assert_eq!(json["firstSeen"], "/in/a.png");
        assert_eq!(json["path"], "/in/b.png");
    }

    #[test]
    fn test_report_totals() {
        let report = IngestReport {
            results: vec![result("/in/a.png")],
            skipped: vec![],
            failures: vec![IngestFailure {
                path: PathBuf::from("/in/c.pdf"),
                stage: FailureStage::Extract,
                message: "bad".to_string(),
            }],
        };
        assert_eq!(report.total(), 2);
        assert!(!report.is_clean());
    }
}
