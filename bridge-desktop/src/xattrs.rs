//! Extended attribute access using the `xattr` crate

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    metadata::ExtendedAttributes,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Desktop extended attributes (`listxattr`/`getxattr`).
///
/// File systems or platforms without attribute support report an empty
/// attribute list instead of an error.
#[derive(Debug, Clone, Default)]
pub struct XattrAttributes;

impl XattrAttributes {
    pub fn new() -> Self {
        Self
    }

    fn is_unsupported(error: &io::Error) -> bool {
        matches!(error.kind(), io::ErrorKind::Unsupported)
            || error.raw_os_error() == Some(95) // EOPNOTSUPP
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("xattr task failed: {}", e)))?
}

#[async_trait]
impl ExtendedAttributes for XattrAttributes {
    async fn list(&self, path: &Path) -> Result<Vec<String>> {
        if !xattr::SUPPORTED_PLATFORM {
            return Ok(Vec::new());
        }

        let path: PathBuf = path.to_path_buf();
        blocking(move || match xattr::list(&path) {
            Ok(names) => Ok(names
                .map(|name| name.to_string_lossy().into_owned())
                .collect()),
            Err(e) if XattrAttributes::is_unsupported(&e) => {
                debug!(path = %path.display(), "Extended attributes unsupported here");
                Ok(Vec::new())
            }
            Err(e) => Err(BridgeError::Io(e)),
        })
        .await
    }

    async fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>> {
        if !xattr::SUPPORTED_PLATFORM {
            return Ok(None);
        }

        let path = path.to_path_buf();
        let name = name.to_string();
        blocking(move || xattr::get(&path, &name).map_err(BridgeError::Io)).await
    }
}
