//! Metadata Source Ports
//!
//! Each universal metadata source the extractor consults is a separate port so
//! hosts can swap the tag-reading tool, the extended-attribute backend, or the
//! system-info provider independently.

use async_trait::async_trait;
use std::path::Path;

use crate::{error::Result, value::RawTree};

/// Generic embedded-tag reader (EXIF, IPTC, XMP, file system group).
///
/// Implementations return a nested tree keyed by tag group, e.g.
/// `{"File": {"FileSize": ...}, "EXIF": {"Make": ...}}`. The caller bounds
/// every call with a timeout, so implementations need not enforce one.
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<RawTree>;

    /// Short identifier used in log fields
    fn name(&self) -> &'static str {
        "tag-reader"
    }
}

/// OS extended attributes of a file.
///
/// A file without attributes, or a platform without attribute support, yields
/// an empty list rather than an error.
#[async_trait]
pub trait ExtendedAttributes: Send + Sync {
    /// List attribute names
    async fn list(&self, path: &Path) -> Result<Vec<String>>;

    /// Read one attribute value; `None` when the attribute vanished
    async fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Host description attached to every extraction (`uname -a` on desktop).
#[async_trait]
pub trait SystemInfoProvider: Send + Sync {
    async fn describe(&self) -> Result<String>;
}
