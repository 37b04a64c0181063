//! # Source Library Module
//!
//! Finds the media files an ingestion run works on and tells them apart.
//!
//! ## Overview
//!
//! This module manages:
//! - Extension classification and content sniffing
//! - Directory scanning with base-name grouping and representative selection
//! - SHA-256 content digests and in-run duplicate tracking

pub mod classifier;
pub mod digest;
pub mod error;
pub mod models;
pub mod scanner;

pub use classifier::{
    canonical_extension, classify, resolve_format, sniff, sniff_file, Classification, MediaKind,
    SniffedType, SupportedFormat,
};
pub use digest::{hash_bytes, hash_file, ContentDigest, DigestCheck, DigestSet};
pub use error::{LibraryError, Result};
pub use models::{FileCandidate, FileGroup};
pub use scanner::DirectoryScanner;
