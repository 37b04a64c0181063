use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    /// Copied size differs from the source size; the copy was removed
    #[error("IntegrityError: {path} has {copied} bytes, expected {expected}")]
    Integrity {
        path: PathBuf,
        expected: u64,
        copied: u64,
    },

    /// Encoder produced a zero-byte file; the file was removed
    #[error("EmptyOutputError: {0} is empty")]
    EmptyOutput(PathBuf),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoded image is malformed: {0}")]
    MalformedImage(String),

    #[error("Conversion task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
