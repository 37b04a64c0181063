//! Store documents built from ingest results

use bridge_traits::{MediaRecord, RecordId, RecordType};
use core_library::MediaKind;
use core_metadata::normalizer::to_json;
use std::path::{Path, PathBuf};

use crate::report::IngestResult;

/// Id the store assigned to the record of one result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub original_path: PathBuf,
}

pub fn record_type(kind: MediaKind) -> RecordType {
    match kind {
        MediaKind::Image => RecordType::Image,
        MediaKind::Audio => RecordType::Audio,
        MediaKind::Pdf => RecordType::Pdf,
        MediaKind::Unknown => RecordType::Other,
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Fresh document for a result: empty AI fields, stem as title.
pub fn build_record(result: &IngestResult) -> MediaRecord {
    MediaRecord {
        record_type: record_type(result.kind),
        original_path: path_string(&result.original_path),
        converted_path: result.converted_path.as_deref().map(path_string),
        title: result.title(),
        description: String::new(),
        tags: Vec::new(),
        matching: Vec::new(),
        embedding: Vec::new(),
        processed: i64::from(result.processed),
        content_hash: result.content_digest.as_str().to_string(),
        metadata: to_json(&result.metadata),
    }
}
