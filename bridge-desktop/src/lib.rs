//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Linux, Windows where the backing tool exists).
//!
//! ## Overview
//!
//! - `TagReader` using the `exiftool` CLI, falling back to `kamadak-exif`
//! - `ExtendedAttributes` using the `xattr` crate
//! - `SystemInfoProvider` using `uname -a`
//! - `HeifDecoder` using libheif (feature `heif`)
//!
//! ## Feature Flags
//!
//! - `heif`: Link libheif for HEIC/HEIF decoding. Without it HEIC conversion
//!   fails per file and the batch continues.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_tag_reader, XattrAttributes, UnameSystemInfo};
//!
//! let tags = default_tag_reader();
//! let xattrs = XattrAttributes::new();
//! let system = UnameSystemInfo::new();
//! ```

mod exiftool;
mod heif;
mod native_exif;
mod system;
mod xattrs;

use bridge_traits::metadata::TagReader;
use std::sync::Arc;

pub use exiftool::ExifToolReader;
pub use heif::{default_heif_decoder, UnsupportedHeifDecoder};
pub use native_exif::{FallbackTagReader, NativeExifReader};
pub use system::UnameSystemInfo;
pub use xattrs::XattrAttributes;

#[cfg(feature = "heif")]
pub use heif::LibHeifDecoder;

/// exiftool when installed, in-process EXIF parsing otherwise
pub fn default_tag_reader() -> Arc<dyn TagReader> {
    Arc::new(FallbackTagReader::new(
        Arc::new(ExifToolReader::new()),
        Arc::new(NativeExifReader::new()),
    ))
}
