//! Tag reader backed by the `exiftool` command line tool

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    metadata::TagReader,
    value::{RawTree, RawValue},
};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Runs `exiftool -j -G -n <file>` and nests the `Group:Tag` keys.
///
/// The child is killed when the returned future is dropped, so a caller-side
/// timeout never leaves a stray process behind.
#[derive(Debug, Clone)]
pub struct ExifToolReader {
    program: PathBuf,
}

impl ExifToolReader {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("exiftool"),
        }
    }

    /// Use a specific executable instead of the one on `PATH`
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExifToolReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagReader for ExifToolReader {
    async fn read(&self, path: &Path) -> Result<RawTree> {
        debug!(path = %path.display(), "Running exiftool");

        let output = Command::new(&self.program)
            .arg("-j")
            .arg("-G")
            .arg("-n")
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BridgeError::NotAvailable(format!(
                    "exiftool executable not found: {}",
                    self.program.display()
                )),
                _ => BridgeError::Io(e),
            })?;

        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::OperationFailed(format!(
                "exiftool exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_exiftool_json(&output.stdout)
    }

    fn name(&self) -> &'static str {
        "exiftool"
    }
}

/// Parse exiftool's JSON array output and group `Group:Tag` keys.
pub(crate) fn parse_exiftool_json(stdout: &[u8]) -> Result<RawTree> {
    let documents: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(stdout).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid exiftool output: {}", e))
        })?;

    let document = documents.into_iter().next().ok_or_else(|| {
        BridgeError::OperationFailed("exiftool returned no documents".to_string())
    })?;

    let mut tree = RawTree::new();
    for (key, value) in document {
        match key.split_once(':') {
            Some((group, tag)) => {
                let entry = tree
                    .entry(group.to_string())
                    .or_insert_with(|| RawValue::Map(RawTree::new()));
                if let RawValue::Map(group_map) = entry {
                    group_map.insert(tag.to_string(), RawValue::from(value));
                }
            }
            None => {
                tree.insert(key, RawValue::from(value));
            }
        }
    }

    Ok(tree)
}
