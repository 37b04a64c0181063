//! Content hashing and in-run duplicate tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{LibraryError, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash a file in fixed-size chunks.
pub async fn hash_file(path: &Path) -> Result<ContentDigest> {
    let wrap = |source| LibraryError::HashFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(wrap)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await.map_err(wrap)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(ContentDigest(format!("{:x}", hasher.finalize())))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> ContentDigest {
    ContentDigest(format!("{:x}", Sha256::digest(bytes)))
}

/// Outcome of [`DigestSet::check_and_insert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    Fresh,
    Duplicate { first_seen: PathBuf },
}

/// Digests seen during one run.
///
/// Check and insert happen under one lock so two callers racing on the same
/// content cannot both see it as fresh.
#[derive(Debug, Default)]
pub struct DigestSet {
    seen: Mutex<HashMap<ContentDigest, PathBuf>>,
}

impl DigestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn check_and_insert(&self, digest: &ContentDigest, path: &Path) -> DigestCheck {
        let mut seen = self.seen.lock().await;
        match seen.get(digest) {
            Some(first_seen) => {
                debug!(
                    path = %path.display(),
                    first_seen = %first_seen.display(),
                    digest = %digest,
                    "Duplicate content"
                );
                DigestCheck::Duplicate {
                    first_seen: first_seen.clone(),
                }
            }
            None => {
                seen.insert(digest.clone(), path.to_path_buf());
                DigestCheck::Fresh
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_hash_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let digest = hash_file(&path).await.unwrap();
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest, hash_bytes(b"abc"));
    }

    #[tokio::test]
    async fn test_hash_spans_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path).await.unwrap(), hash_bytes(&data));
    }

    #[tokio::test]
    async fn test_hash_missing_file_reports_path() {
        let err = hash_file(Path::new("/nope/missing.png")).await.unwrap_err();
        match err {
            LibraryError::HashFailed { path, .. } => {
                assert_eq!(path, PathBuf::from("/nope/missing.png"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_sighting_is_duplicate() {
        let set = DigestSet::new();
        let digest = hash_bytes(b"same");

        assert_eq!(
            set.check_and_insert(&digest, Path::new("/in/a.png")).await,
            DigestCheck::Fresh
        );
        assert_eq!(
            set.check_and_insert(&digest, Path::new("/in/b.png")).await,
            DigestCheck::Duplicate {
                first_seen: PathBuf::from("/in/a.png")
            }
        );
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_admit_exactly_one() {
        let set = Arc::new(DigestSet::new());
        let digest = hash_bytes(b"contended");

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let set = Arc::clone(&set);
                let digest = digest.clone();
                tokio::spawn(async move {
                    let path = PathBuf::from(format!("/in/{}.png", i));
                    set.check_and_insert(&digest, &path).await
                })
            })
            .collect();

        let mut fresh = 0;
        for handle in handles {
            if handle.await.unwrap() == DigestCheck::Fresh {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);
    }
}
