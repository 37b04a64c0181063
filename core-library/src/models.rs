//! Scan-time models
//!
//! Candidates and groups only live for the duration of one scan; nothing
//! here is persisted.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::classifier::{MediaKind, SupportedFormat};

/// A supported file found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path without its extension; the grouping key
    pub base_name: PathBuf,
    /// Format implied by the extension
    pub format: SupportedFormat,
    /// Content type sniffed from the file head, if recognised
    pub detected_mime: Option<String>,
    /// Creation time, or modification time where the platform lacks it
    pub created: Option<SystemTime>,
}

impl FileCandidate {
    pub fn kind(&self) -> MediaKind {
        self.format.kind()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Files sharing one base name, e.g. `img.heic` and `img.avif`.
#[derive(Debug, Clone)]
pub struct FileGroup {
    pub base_name: PathBuf,
    pub members: Vec<FileCandidate>,
}

impl FileGroup {
    pub fn new(base_name: PathBuf) -> Self {
        Self {
            base_name,
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, candidate: FileCandidate) {
        self.members.push(candidate);
    }

    /// Pick the single member carried forward into the pipeline.
    ///
    /// Members that are not AVIF/HEIC/HEIF always beat those that are. Within
    /// the winning tier the oldest creation time wins; equal times prefer
    /// AVIF, then the lexically smaller path.
    pub fn into_representative(self) -> Option<FileCandidate> {
        let has_plain_member = self
            .members
            .iter()
            .any(|m| !m.format.is_conversion_sensitive());

        self.members
            .into_iter()
            .filter(|m| !has_plain_member || !m.format.is_conversion_sensitive())
            .min_by(compare_for_selection)
    }
}

fn compare_for_selection(a: &FileCandidate, b: &FileCandidate) -> Ordering {
    // Known creation times sort before unknown ones
    let by_time = match (a.created, b.created) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    let avif_rank = |c: &FileCandidate| u8::from(c.format != SupportedFormat::Avif);

    by_time
        .then_with(|| avif_rank(a).cmp(&avif_rank(b)))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn candidate(name: &str, secs: Option<u64>) -> FileCandidate {
        let path = PathBuf::from("/in").join(name);
        let format = crate::classifier::classify(&path).format.unwrap();
        FileCandidate {
            base_name: path.with_extension(""),
            path,
            format,
            detected_mime: None,
            created: secs.map(|s| SystemTime::UNIX_EPOCH + Duration::from_secs(s)),
        }
    }

    fn group(members: Vec<FileCandidate>) -> FileGroup {
        FileGroup {
            base_name: members[0].base_name.clone(),
            members,
        }
    }

    #[test]
    fn test_plain_member_beats_older_sensitive_members() {
        let chosen = group(vec![
            candidate("img.heic", Some(10)),
            candidate("img.avif", Some(20)),
            candidate("img.jpg", Some(99)),
        ])
        .into_representative()
        .unwrap();

        assert_eq!(chosen.file_name(), "img.jpg");
    }

    #[test]
    fn test_oldest_sensitive_member_wins() {
        let chosen = group(vec![
            candidate("img.heic", Some(20)),
            candidate("img.avif", Some(10)),
        ])
        .into_representative()
        .unwrap();
        assert_eq!(chosen.file_name(), "img.avif");

        let chosen = group(vec![
            candidate("img.avif", Some(20)),
            candidate("img.heic", Some(10)),
        ])
        .into_representative()
        .unwrap();
        assert_eq!(chosen.file_name(), "img.heic");
    }

    #[test]
    fn test_tie_prefers_avif_then_path() {
        let chosen = group(vec![
            candidate("img.heic", Some(10)),
            candidate("img.avif", Some(10)),
        ])
        .into_representative()
        .unwrap();
        assert_eq!(chosen.file_name(), "img.avif");

        let chosen = group(vec![
            candidate("img.png", None),
            candidate("img.jpg", None),
        ])
        .into_representative()
        .unwrap();
        assert_eq!(chosen.file_name(), "img.jpg");
    }

    #[test]
    fn test_known_time_beats_unknown() {
        let chosen = group(vec![
            candidate("img.heic", None),
            candidate("img.heif", Some(50)),
        ])
        .into_representative()
        .unwrap();
        assert_eq!(chosen.file_name(), "img.heif");
    }

    #[test]
    fn test_empty_group_has_no_representative() {
        assert!(FileGroup::new(PathBuf::from("/in/x"))
            .into_representative()
            .is_none());
    }
}
