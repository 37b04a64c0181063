//! # Host Bridge Traits
//!
//! Platform abstraction traits the ingest core depends on.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and the
//! platform-specific implementations in `bridge-desktop`. Each trait is a
//! capability that the core requires but that the host may provide
//! differently (an external tool, a native library, a test double).
//!
//! ## Traits
//!
//! ### Metadata sources
//! - [`TagReader`](metadata::TagReader) - Embedded tags (EXIF/IPTC/XMP + file system group)
//! - [`ExtendedAttributes`](metadata::ExtendedAttributes) - OS extended attributes
//! - [`SystemInfoProvider`](metadata::SystemInfoProvider) - Host description string
//!
//! ### Media
//! - [`HeifDecoder`](imaging::HeifDecoder) - HEIC/HEIF container decoding
//!
//! ### Downstream collaborators
//! - [`MediaStore`](store::MediaStore) - Document store with vector search
//! - [`Tagger`](tagging::Tagger) - AI description, tags and embeddings
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing. See `core_runtime::config::IngestConfigBuilder::build`.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors and include context such as file paths.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that handles can be shared by
//! the concurrently processed files of a batch.

pub mod error;
pub mod imaging;
pub mod log;
pub mod metadata;
pub mod store;
pub mod tagging;
pub mod value;

pub use error::BridgeError;

// Re-export commonly used types
pub use imaging::{DecodedImage, HeifDecoder};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink, RecordingLogger};
pub use metadata::{ExtendedAttributes, SystemInfoProvider, TagReader};
pub use store::{MediaRecord, MediaStore, RecordId, RecordPatch, RecordType, VectorMatch};
pub use tagging::{TagSuggestion, Tagger};
pub use value::{AppleProvenanceRecord, RawTree, RawValue};
