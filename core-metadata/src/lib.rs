//! # Metadata Module
//!
//! Extracts raw metadata from source files and normalizes it into flat,
//! typed key/value maps.
//!
//! ## Overview
//!
//! This module handles:
//! - Generic tag reading through the injected `TagReader` (time-boxed)
//! - Extended attributes, including the binary-plist provenance attribute
//! - Audio container and tag properties (ID3v2, ID3v1, RIFF INFO, ...)
//! - PDF document properties
//! - Flattening and value coercion (dates, nested arrays, display dates)

pub mod audio;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod pdf;
pub mod provenance;

pub use error::{MetadataError, Result};
pub use extractor::{AttributeExtractor, ExtractionBranch};
pub use normalizer::{normalize, FlatMetadata, MetadataValue};
pub use provenance::{parse_provenance, PROVENANCE_ATTRIBUTE};
