//! Directory scanning with base-name grouping
//!
//! The scanner lists a source directory, keeps supported files, groups them
//! by base name and emits exactly one representative per group.
//!
//! ## Usage
//!
//! ```ignore
//! use core_library::scanner::DirectoryScanner;
//! use core_runtime::config::ScanMode;
//!
//! let candidates = DirectoryScanner::new(ScanMode::Flat)
//!     .scan(Path::new("/photos/inbox"))
//!     .await?;
//! ```

use core_runtime::config::ScanMode;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, trace, warn};

use crate::classifier::{classify, sniff_file};
use crate::error::{LibraryError, Result};
use crate::models::{FileCandidate, FileGroup};

/// Lists and groups supported files.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    mode: ScanMode,
    excluded: Option<PathBuf>,
}

impl DirectoryScanner {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            excluded: None,
        }
    }

    /// Skip `dir` and everything below it during recursive walks, unless it
    /// is the scanned directory itself
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded = Some(dir.into());
        self
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Scan `dir` and return one representative per base-name group, sorted
    /// by path.
    ///
    /// # Errors
    ///
    /// [`LibraryError::DirectoryNotFound`] when `dir` does not exist or is not
    /// a directory. An empty directory yields an empty Vec.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<FileCandidate>> {
        let root = match fs::canonicalize(dir).await {
            Ok(root) => root,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LibraryError::DirectoryNotFound(dir.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if !fs::metadata(&root).await?.is_dir() {
            return Err(LibraryError::DirectoryNotFound(dir.to_path_buf()));
        }

        let paths = match self.mode {
            ScanMode::Flat => list_flat(&root).await?,
            ScanMode::Recursive => {
                let excluded = match &self.excluded {
                    Some(dir) => fs::canonicalize(dir).await.ok().filter(|dir| *dir != root),
                    None => None,
                };
                list_recursive(root.clone(), excluded).await?
            }
        };

        let listed = paths.len();
        let mut groups: BTreeMap<PathBuf, FileGroup> = BTreeMap::new();

        for path in paths {
            let Some(format) = classify(&path).format else {
                trace!(path = %path.display(), "Skipping unsupported file");
                continue;
            };

            let stats = match fs::metadata(&path).await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "File vanished during scan");
                    continue;
                }
            };
            let created = stats.created().or_else(|_| stats.modified()).ok();

            let detected_mime = match sniff_file(&path).await {
                Ok(sniffed) => sniffed.map(|s| s.mime),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not sniff file head");
                    None
                }
            };

            let base_name = path.with_extension("");
            groups
                .entry(base_name.clone())
                .or_insert_with(|| FileGroup::new(base_name.clone()))
                .push(FileCandidate {
                    path,
                    base_name,
                    format,
                    detected_mime,
                    created,
                });
        }

        let group_count = groups.len();
        let mut candidates: Vec<FileCandidate> = groups
            .into_values()
            .filter_map(|group| {
                let members = group.members.len();
                let chosen = group.into_representative();
                if members > 1 {
                    if let Some(chosen) = &chosen {
                        debug!(
                            representative = %chosen.path.display(),
                            members,
                            "Selected group representative"
                        );
                    }
                }
                chosen
            })
            .collect();
        candidates.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            dir = %root.display(),
            listed,
            groups = group_count,
            candidates = candidates.len(),
            "Directory scanned"
        );

        Ok(candidates)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

async fn list_flat(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(root).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if is_hidden(&entry.file_name()) {
            continue;
        }
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(stats) if stats.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Unreadable directory entry"),
        }
    }

    Ok(paths)
}

async fn list_recursive(root: PathBuf, excluded: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || {
        walkdir::WalkDir::new(&root)
            .min_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                !is_hidden(entry.file_name())
                    && excluded.as_deref() != Some(entry.path())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path during walk");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    })
    .await
    .map_err(|e| LibraryError::Walk(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PNG_HEAD: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn write(dir: &Path, name: &str, bytes: &[u8]) {
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    fn names(candidates: &[FileCandidate]) -> Vec<String> {
        candidates.iter().map(|c| c.file_name()).collect()
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let result = DirectoryScanner::default()
            .scan(Path::new("/definitely/not/here"))
            .await;
        assert!(matches!(result, Err(LibraryError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_file_path_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", PNG_HEAD);

        let result = DirectoryScanner::default()
            .scan(&dir.path().join("a.png"))
            .await;
        assert!(matches!(result, Err(LibraryError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = DirectoryScanner::default().scan(dir.path()).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_filters_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "img.heic", b"heic");
        write(dir.path(), "img.avif", b"avif");
        write(dir.path(), "img.png", PNG_HEAD);
        write(dir.path(), "song.mp3", b"ID3");
        write(dir.path(), "notes.txt", b"text");
        write(dir.path(), ".temp_img.png_attr_x", b"hidden");
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let candidates = DirectoryScanner::default().scan(dir.path()).await.unwrap();

        assert_eq!(names(&candidates), vec!["img.png", "song.mp3"]);
        let png = &candidates[0];
        assert!(png.path.is_absolute());
        assert_eq!(png.detected_mime.as_deref(), Some("image/png"));
        assert_eq!(png.base_name, png.path.with_extension(""));
    }

    #[tokio::test]
    async fn test_all_sensitive_group_picks_oldest() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "photo.avif", b"first");
        tokio::time::sleep(Duration::from_millis(20)).await;
        write(dir.path(), "photo.heic", b"second");

        let candidates = DirectoryScanner::default().scan(dir.path()).await.unwrap();

        assert_eq!(names(&candidates), vec!["photo.avif"]);
    }

    #[tokio::test]
    async fn test_flat_ignores_subdirectories_recursive_does_not() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write(dir.path(), "top.png", PNG_HEAD);
        write(&dir.path().join("sub"), "top.png", PNG_HEAD);
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        write(&dir.path().join(".cache"), "hidden.png", PNG_HEAD);

        let flat = DirectoryScanner::new(ScanMode::Flat)
            .scan(dir.path())
            .await
            .unwrap();
        assert_eq!(flat.len(), 1);

        let recursive = DirectoryScanner::new(ScanMode::Recursive)
            .scan(dir.path())
            .await
            .unwrap();
        // Same file name in different folders are separate groups
        assert_eq!(recursive.len(), 2);
        assert!(recursive
            .iter()
            .all(|c| !c.path.to_string_lossy().contains(".cache")));
    }

    #[tokio::test]
    async fn test_recursive_walk_skips_excluded_directory() {
        let dir = tempfile::tempdir().unwrap();
        let managed = dir.path().join("db").join("media");
        std::fs::create_dir_all(&managed).unwrap();
        write(dir.path(), "fresh.png", PNG_HEAD);
        write(&managed, "stored.png", PNG_HEAD);

        let scanner = DirectoryScanner::new(ScanMode::Recursive).excluding(&managed);

        let from_parent = scanner.scan(dir.path()).await.unwrap();
        assert_eq!(names(&from_parent), vec!["fresh.png"]);

        // Scanning the excluded directory itself still lists it
        let from_managed = scanner.scan(&managed).await.unwrap();
        assert_eq!(names(&from_managed), vec!["stored.png"]);
    }
}
