//! # Ingest Core
//!
//! Entry point of the media ingestion pipeline. Ties the scanner, hasher,
//! converter and metadata extractor together into batch runs, and hands
//! finished results to the media store and AI tagger.
//!
//! ## Overview
//!
//! This module provides:
//! - `Ingestor`: one batch run over a source directory
//! - `IngestReport`: results, duplicate skips and per-file failures
//! - Record building and persistence through the `MediaStore` port
//! - `Enricher`: rate-limited AI tagging with retries

pub mod enrich;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod report;

pub use enrich::{is_rate_limited, Enricher};
pub use error::{IngestError, Result};
pub use orchestrator::Ingestor;
pub use record::{build_record, StoredRecord};
pub use report::{
    FailureStage, IngestFailure, IngestReport, IngestResult, SkipReason, SkippedFile,
};
