use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole batch or a store hand-off.
///
/// Per-file problems never surface here; they become
/// [`IngestFailure`](crate::report::IngestFailure) entries.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Source directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Managed storage unavailable at {path}: {source}")]
    ManagedStorage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {0} configured")]
    MissingCollaborator(&'static str),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] core_media::ConversionError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
