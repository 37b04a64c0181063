use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Tag read for {path} timed out after {timeout:?}")]
    TagReadTimeout { path: PathBuf, timeout: Duration },

    #[error("Failed to extract metadata: {0}")]
    ExtractionFailed(String),

    #[error("Audio tag read failed: {0}")]
    Audio(String),

    #[error("PDF properties read failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
