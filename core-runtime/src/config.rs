//! # Ingest Configuration Module
//!
//! Provides configuration management for the media ingest core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `IngestConfig` holding every bridge and setting the pipeline needs. It
//! enforces fail-fast validation so that a batch never starts with a missing
//! capability.
//!
//! ## Required Dependencies (with desktop defaults)
//!
//! - `TagReader` - Generic embedded tag reader (desktop: exiftool, falling back to kamadak-exif)
//! - `ExtendedAttributes` - OS extended attributes (desktop: `xattr`)
//! - `SystemInfoProvider` - Host description (desktop: `uname -a`)
//! - `HeifDecoder` - HEIC/HEIF decoding (desktop: libheif with the `heif` feature)
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - Receives per-file failures and duplicate skips (default: console)
//! - `MediaStore` - Persisted records, also consulted for known digests
//! - `Tagger` - AI description/tagging collaborator
//!
//! When the `desktop-shims` feature is enabled, the desktop adapters are
//! injected automatically for any required bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{IngestConfig, HeicTarget};
//!
//! let config = IngestConfig::builder()
//!     .managed_dir("db/media")
//!     .max_concurrent(8)
//!     .heic_target(HeicTarget::Jpeg)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use bridge_traits::{
    ConsoleLogger, ExtendedAttributes, HeifDecoder, LoggerSink, MediaStore, SystemInfoProvider,
    TagReader, Tagger,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default managed storage directory, relative to the working directory
pub const DEFAULT_MANAGED_DIR: &str = "db/media";

/// Output format for decoded HEIC/HEIF images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeicTarget {
    #[default]
    Avif,
    Jpeg,
}

/// How the scanner enumerates the source directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Direct children only
    #[default]
    Flat,
    /// Every file below the directory
    Recursive,
}

/// Encoder settings used by the format converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingSettings {
    /// AVIF quality, 1-100
    pub avif_quality: u8,
    /// AVIF encoder speed, 1 (slowest) - 10 (fastest)
    pub avif_speed: u8,
    /// JPEG quality for HEIC to JPEG, 1-100
    pub jpeg_quality: u8,
    /// Target format for HEIC/HEIF sources
    pub heic_target: HeicTarget,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            avif_quality: 80,
            avif_speed: 6,
            jpeg_quality: 80,
            heic_target: HeicTarget::Avif,
        }
    }
}

impl EncodingSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.avif_quality) {
            return Err(Error::Config(
                "AVIF quality must be between 1 and 100".to_string(),
            ));
        }
        if !(1..=10).contains(&self.avif_speed) {
            return Err(Error::Config(
                "AVIF speed must be between 1 and 10".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ingest configuration.
///
/// Use [`IngestConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct IngestConfig {
    /// Directory the pipeline owns and copies files into
    pub managed_dir: PathBuf,

    /// Upper bound for files hashed or processed at the same time
    pub max_concurrent: usize,

    /// Time box for a single tag-reader call
    pub tag_read_timeout: Duration,

    /// Flat listing or recursive walk
    pub scan_mode: ScanMode,

    /// Converter settings
    pub encoding: EncodingSettings,

    /// Also skip files whose digest the media store already knows
    pub check_store_for_duplicates: bool,

    /// Retry policy for rate-limited collaborators
    pub retry_policy: RetryPolicy,

    pub logger_sink: Arc<dyn LoggerSink>,
    pub tag_reader: Arc<dyn TagReader>,
    pub extended_attributes: Arc<dyn ExtendedAttributes>,
    pub system_info: Arc<dyn SystemInfoProvider>,
    pub heif_decoder: Arc<dyn HeifDecoder>,
    pub media_store: Option<Arc<dyn MediaStore>>,
    pub tagger: Option<Arc<dyn Tagger>>,
}

impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("managed_dir", &self.managed_dir)
            .field("max_concurrent", &self.max_concurrent)
            .field("tag_read_timeout", &self.tag_read_timeout)
            .field("scan_mode", &self.scan_mode)
            .field("encoding", &self.encoding)
            .field("check_store_for_duplicates", &self.check_store_for_duplicates)
            .field("retry_policy", &self.retry_policy)
            .field("logger_sink", &"LoggerSink { ... }")
            .field("tag_reader", &self.tag_reader.name())
            .field("extended_attributes", &"ExtendedAttributes { ... }")
            .field("system_info", &"SystemInfoProvider { ... }")
            .field("heif_decoder", &"HeifDecoder { ... }")
            .field(
                "media_store",
                &self.media_store.as_ref().map(|_| "MediaStore { ... }"),
            )
            .field("tagger", &self.tagger.as_ref().map(|_| "Tagger { ... }"))
            .finish()
    }
}

impl IngestConfig {
    /// Creates a new builder for constructing an `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Managed directory is not empty
    /// - Concurrency is between 1 and 64
    /// - Tag read timeout is between 1ms and 120s
    /// - Encoder settings are in range
    /// - The store duplicate check has a store to ask
    pub fn validate(&self) -> Result<()> {
        if self.managed_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Managed directory cannot be empty".to_string(),
            ));
        }

        if self.max_concurrent == 0 || self.max_concurrent > 64 {
            return Err(Error::Config(
                "max_concurrent must be between 1 and 64".to_string(),
            ));
        }

        if self.tag_read_timeout.is_zero() {
            return Err(Error::Config(
                "Tag read timeout must be greater than 0".to_string(),
            ));
        }

        if self.tag_read_timeout > Duration::from_secs(120) {
            return Err(Error::Config(
                "Tag read timeout exceeds maximum of 120 seconds".to_string(),
            ));
        }

        self.encoding.validate()?;

        if self.check_store_for_duplicates && self.media_store.is_none() {
            return Err(Error::Config(
                "Store duplicate check enabled but no MediaStore provided. \
                 Disable the check or inject a MediaStore implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: ensure the 'desktop-shims' feature is enabled to use the default adapter. \
             Other hosts: inject a platform implementation.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_tag_reader() -> Result<Arc<dyn TagReader>> {
    Ok(bridge_desktop::default_tag_reader())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_tag_reader() -> Result<Arc<dyn TagReader>> {
    Err(capability_missing("TagReader", "embedded tag extraction"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_extended_attributes() -> Result<Arc<dyn ExtendedAttributes>> {
    Ok(Arc::new(bridge_desktop::XattrAttributes::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_extended_attributes() -> Result<Arc<dyn ExtendedAttributes>> {
    Err(capability_missing(
        "ExtendedAttributes",
        "extended attribute extraction",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_system_info() -> Result<Arc<dyn SystemInfoProvider>> {
    Ok(Arc::new(bridge_desktop::UnameSystemInfo::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_system_info() -> Result<Arc<dyn SystemInfoProvider>> {
    Err(capability_missing("SystemInfoProvider", "system context"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_heif_decoder() -> Result<Arc<dyn HeifDecoder>> {
    Ok(bridge_desktop::default_heif_decoder())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_heif_decoder() -> Result<Arc<dyn HeifDecoder>> {
    Err(capability_missing("HeifDecoder", "HEIC/HEIF conversion"))
}

/// Builder for constructing [`IngestConfig`] instances.
#[derive(Default)]
pub struct IngestConfigBuilder {
    managed_dir: Option<PathBuf>,
    max_concurrent: Option<usize>,
    tag_read_timeout: Option<Duration>,
    scan_mode: ScanMode,
    encoding: EncodingSettings,
    check_store_for_duplicates: Option<bool>,
    retry_policy: Option<RetryPolicy>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    tag_reader: Option<Arc<dyn TagReader>>,
    extended_attributes: Option<Arc<dyn ExtendedAttributes>>,
    system_info: Option<Arc<dyn SystemInfoProvider>>,
    heif_decoder: Option<Arc<dyn HeifDecoder>>,
    media_store: Option<Arc<dyn MediaStore>>,
    tagger: Option<Arc<dyn Tagger>>,
}

impl IngestConfigBuilder {
    /// Sets the managed storage directory.
    ///
    /// Default: `db/media`
    pub fn managed_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.managed_dir = Some(path.into());
        self
    }

    /// Sets the concurrency bound for hashing and per-file processing.
    ///
    /// Default: 4
    pub fn max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = Some(limit);
        self
    }

    /// Sets the time box for one tag-reader call.
    ///
    /// Default: 5 seconds
    pub fn tag_read_timeout(mut self, timeout: Duration) -> Self {
        self.tag_read_timeout = Some(timeout);
        self
    }

    /// Sets flat or recursive scanning.
    pub fn scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    /// Replaces all encoder settings at once.
    pub fn encoding(mut self, encoding: EncodingSettings) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the AVIF quality (1-100). Default: 80
    pub fn avif_quality(mut self, quality: u8) -> Self {
        self.encoding.avif_quality = quality;
        self
    }

    /// Sets the AVIF encoder speed (1-10). Default: 6
    pub fn avif_speed(mut self, speed: u8) -> Self {
        self.encoding.avif_speed = speed;
        self
    }

    /// Sets the JPEG quality for HEIC to JPEG (1-100). Default: 80
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.encoding.jpeg_quality = quality;
        self
    }

    /// Sets the output format for HEIC/HEIF sources. Default: AVIF
    pub fn heic_target(mut self, target: HeicTarget) -> Self {
        self.encoding.heic_target = target;
        self
    }

    /// Enables or disables skipping digests already known to the store.
    ///
    /// Default: enabled whenever a `MediaStore` is provided.
    pub fn check_store_for_duplicates(mut self, enabled: bool) -> Self {
        self.check_store_for_duplicates = Some(enabled);
        self
    }

    /// Sets the retry policy for rate-limited collaborators.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the sink that receives failures and duplicate skips.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    pub fn extended_attributes(mut self, attributes: Arc<dyn ExtendedAttributes>) -> Self {
        self.extended_attributes = Some(attributes);
        self
    }

    pub fn system_info(mut self, provider: Arc<dyn SystemInfoProvider>) -> Self {
        self.system_info = Some(provider);
        self
    }

    pub fn heif_decoder(mut self, decoder: Arc<dyn HeifDecoder>) -> Self {
        self.heif_decoder = Some(decoder);
        self
    }

    pub fn media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Builds the final `IngestConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(IngestConfig)` on success, or an error if:
    /// - A required bridge is missing and no desktop default is available
    /// - Configuration values are out of range
    pub fn build(self) -> Result<IngestConfig> {
        let tag_reader = match self.tag_reader {
            Some(reader) => reader,
            None => provide_default_tag_reader()?,
        };

        let extended_attributes = match self.extended_attributes {
            Some(attributes) => attributes,
            None => provide_default_extended_attributes()?,
        };

        let system_info = match self.system_info {
            Some(provider) => provider,
            None => provide_default_system_info()?,
        };

        let heif_decoder = match self.heif_decoder {
            Some(decoder) => decoder,
            None => provide_default_heif_decoder()?,
        };

        let logger_sink = self
            .logger_sink
            .unwrap_or_else(|| Arc::new(ConsoleLogger::default()));

        let check_store_for_duplicates = self
            .check_store_for_duplicates
            .unwrap_or(self.media_store.is_some());

        let config = IngestConfig {
            managed_dir: self
                .managed_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANAGED_DIR)),
            max_concurrent: self.max_concurrent.unwrap_or(4),
            tag_read_timeout: self.tag_read_timeout.unwrap_or(Duration::from_secs(5)),
            scan_mode: self.scan_mode,
            encoding: self.encoding,
            check_store_for_duplicates,
            retry_policy: self.retry_policy.unwrap_or_default(),
            logger_sink,
            tag_reader,
            extended_attributes,
            system_info,
            heif_decoder,
            media_store: self.media_store,
            tagger: self.tagger,
        };

        config.validate()?;

        Ok(config)
    }
}
