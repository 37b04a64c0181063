//! Format Conversion
//!
//! Copies source files into managed storage and derives the stored
//! rendition:
//!
//! - PNG/JPEG are re-encoded to AVIF
//! - AVIF is already in the target format and passes through
//! - HEIC/HEIF are decoded through the [`HeifDecoder`] port and encoded to
//!   AVIF or JPEG
//! - PDF and MP3 have no rendition
//!
//! Every write is followed by a size check. A failed check removes the bad
//! file so managed storage never holds a truncated or empty artifact.
//!
//! ## Usage
//!
//! ```ignore
//! use core_media::FormatConverter;
//!
//! let converter = FormatConverter::from_config(&config);
//! let copy = converter.copy_to_managed(&source, &config.managed_dir).await?;
//! let converted = converter.convert(&copy, &config.managed_dir).await?;
//! ```

use async_trait::async_trait;
use bridge_traits::HeifDecoder;
use core_library::classifier::UNKNOWN_EXTENSION;
use core_library::{resolve_format, sniff_file, SupportedFormat};
use core_runtime::config::{EncodingSettings, HeicTarget, IngestConfig};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ConversionError, Result};

/// Byte-level file copy.
///
/// Returns the number of bytes written. Injected so tests can simulate
/// partial writes.
#[async_trait]
pub trait ByteCopier: Send + Sync {
    async fn copy(&self, from: &Path, to: &Path) -> std::io::Result<u64>;
}

/// Copier backed by `tokio::fs::copy`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCopier;

#[async_trait]
impl ByteCopier for TokioCopier {
    async fn copy(&self, from: &Path, to: &Path) -> std::io::Result<u64> {
        tokio::fs::copy(from, to).await
    }
}

/// A source file after it was copied into managed storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedCopy {
    pub path: PathBuf,
    /// Sniffed content type, if recognised
    pub mime: Option<String>,
    /// Effective format: sniffed, else from the source extension
    pub format: Option<SupportedFormat>,
}

/// What happens to a managed copy after it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPlan {
    /// Decode HEIC/HEIF and encode to the target
    HeicTo(HeicTarget),
    /// Already AVIF; the managed copy is the rendition
    PassThrough,
    /// Raster re-encode to AVIF
    ToAvif,
    /// No rendition
    None,
}

impl ConversionPlan {
    pub fn for_format(format: Option<SupportedFormat>, heic_target: HeicTarget) -> Self {
        match format {
            Some(SupportedFormat::Heic | SupportedFormat::Heif) => Self::HeicTo(heic_target),
            Some(SupportedFormat::Avif) => Self::PassThrough,
            Some(SupportedFormat::Png | SupportedFormat::Jpeg) => Self::ToAvif,
            Some(SupportedFormat::Pdf | SupportedFormat::Mp3) | None => Self::None,
        }
    }
}

/// Copies into managed storage and produces renditions.
#[derive(Clone)]
pub struct FormatConverter {
    copier: Arc<dyn ByteCopier>,
    heif_decoder: Arc<dyn HeifDecoder>,
    settings: EncodingSettings,
}

impl FormatConverter {
    pub fn new(heif_decoder: Arc<dyn HeifDecoder>, settings: EncodingSettings) -> Self {
        Self {
            copier: Arc::new(TokioCopier),
            heif_decoder,
            settings,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(Arc::clone(&config.heif_decoder), config.encoding)
    }

    /// Replace the byte copier
    pub fn with_copier(mut self, copier: Arc<dyn ByteCopier>) -> Self {
        self.copier = copier;
        self
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Copy `source` to `dest_dir/<stem><ext>`, where the extension follows
    /// the sniffed content type.
    ///
    /// # Errors
    ///
    /// [`ConversionError::Integrity`] when the copy's size differs from the
    /// source; the copy is removed first.
    ///
    /// A source that already is its own managed copy is returned untouched.
    pub async fn copy_to_managed(&self, source: &Path, dest_dir: &Path) -> Result<ManagedCopy> {
        let sniffed = sniff_file(source).await?;
        let format = resolve_format(sniffed.as_ref(), source);
        let extension = match (&sniffed, format) {
            (Some(sniffed), _) => sniffed.canonical_extension(),
            (None, Some(format)) => format.canonical_extension(),
            (None, None) => UNKNOWN_EXTENSION,
        };

        let dest = dest_dir.join(format!("{}{}", file_stem(source), extension));

        if is_same_file(source, &dest).await {
            debug!(path = %source.display(), "Source already in managed storage");
            return Ok(ManagedCopy {
                path: dest,
                mime: sniffed.map(|s| s.mime),
                format,
            });
        }

        let expected = tokio::fs::metadata(source).await?.len();

        if let Err(e) = self.copier.copy(source, &dest).await {
            remove_partial(&dest).await;
            return Err(e.into());
        }

        let copied = match tokio::fs::metadata(&dest).await {
            Ok(stats) => stats.len(),
            Err(_) => 0,
        };
        if copied != expected {
            remove_partial(&dest).await;
            return Err(ConversionError::Integrity {
                path: dest,
                expected,
                copied,
            });
        }

        debug!(
            source = %source.display(),
            dest = %dest.display(),
            bytes = copied,
            "Copied into managed storage"
        );

        Ok(ManagedCopy {
            path: dest,
            mime: sniffed.map(|s| s.mime),
            format,
        })
    }

    /// Re-encode a raster image to `dest_dir/<stem>.avif`.
    ///
    /// # Errors
    ///
    /// Decode or encode failures, and [`ConversionError::EmptyOutput`] for a
    /// zero-byte result. Partial output is removed in every failure case.
    pub async fn convert_to_avif(&self, input: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let output = dest_dir.join(format!("{}.avif", file_stem(input)));
        let bytes = tokio::fs::read(input).await?;
        let settings = self.settings;
        let target = output.clone();

        let encoded = tokio::task::spawn_blocking(move || -> Result<()> {
            let img = image::load_from_memory(&bytes)?;
            write_avif(&img, &target, &settings)
        })
        .await
        .map_err(|e| ConversionError::Task(e.to_string()))
        .and_then(|result| result);

        if let Err(e) = encoded {
            remove_partial(&output).await;
            return Err(e);
        }

        ensure_non_empty(&output).await?;
        info!(input = %input.display(), output = %output.display(), "Encoded AVIF");
        Ok(output)
    }

    /// Decode a HEIC/HEIF file and encode it to `target`.
    ///
    /// Never fails: any problem is logged, partial output is removed and
    /// `None` is returned.
    pub async fn convert_heic(
        &self,
        input: &Path,
        dest_dir: &Path,
        target: HeicTarget,
    ) -> Option<PathBuf> {
        let extension = match target {
            HeicTarget::Avif => "avif",
            HeicTarget::Jpeg => "jpg",
        };
        let output = dest_dir.join(format!("{}.{}", file_stem(input), extension));

        match self.try_convert_heic(input, &output, target).await {
            Ok(()) => {
                info!(
                    input = %input.display(),
                    output = %output.display(),
                    target = ?target,
                    "Converted HEIC"
                );
                Some(output)
            }
            Err(e) => {
                remove_partial(&output).await;
                warn!(input = %input.display(), error = %e, "HEIC conversion failed");
                None
            }
        }
    }

    async fn try_convert_heic(&self, input: &Path, output: &Path, target: HeicTarget) -> Result<()> {
        let bytes = tokio::fs::read(input).await?;
        let decoder = Arc::clone(&self.heif_decoder);
        let settings = self.settings;
        let output_owned = output.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let decoded = decoder.decode(&bytes)?;
            if !decoded.is_consistent() {
                return Err(ConversionError::MalformedImage(format!(
                    "{}x{} with {} bytes",
                    decoded.width,
                    decoded.height,
                    decoded.rgba.len()
                )));
            }
            let buffer = RgbaImage::from_raw(decoded.width, decoded.height, decoded.rgba)
                .ok_or_else(|| ConversionError::MalformedImage("buffer too small".to_string()))?;
            let img = DynamicImage::ImageRgba8(buffer);

            match target {
                HeicTarget::Avif => write_avif(&img, &output_owned, &settings),
                HeicTarget::Jpeg => write_jpeg(&img, &output_owned, settings.jpeg_quality),
            }
        })
        .await
        .map_err(|e| ConversionError::Task(e.to_string()))??;

        ensure_non_empty(output).await
    }

    /// Apply the plan for `copy`. Returns the rendition path, if any.
    pub async fn convert(&self, copy: &ManagedCopy, dest_dir: &Path) -> Result<Option<PathBuf>> {
        let plan = ConversionPlan::for_format(copy.format, self.settings.heic_target);
        debug!(path = %copy.path.display(), plan = ?plan, "Conversion plan");

        match plan {
            ConversionPlan::HeicTo(target) => {
                Ok(self.convert_heic(&copy.path, dest_dir, target).await)
            }
            ConversionPlan::PassThrough => Ok(Some(copy.path.clone())),
            ConversionPlan::ToAvif => self.convert_to_avif(&copy.path, dest_dir).await.map(Some),
            ConversionPlan::None => Ok(None),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}

fn write_avif(img: &DynamicImage, output: &Path, settings: &EncodingSettings) -> Result<()> {
    let writer = BufWriter::new(File::create(output)?);
    let encoder =
        AvifEncoder::new_with_speed_quality(writer, settings.avif_speed, settings.avif_quality);
    DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)?;
    Ok(())
}

fn write_jpeg(img: &DynamicImage, output: &Path, quality: u8) -> Result<()> {
    let writer = BufWriter::new(File::create(output)?);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(())
}

/// Both paths resolve to one existing file
async fn is_same_file(source: &Path, dest: &Path) -> bool {
    match (
        tokio::fs::canonicalize(source).await,
        tokio::fs::canonicalize(dest).await,
    ) {
        (Ok(source), Ok(dest)) => source == dest,
        _ => false,
    }
}

async fn ensure_non_empty(output: &Path) -> Result<()> {
    let size = tokio::fs::metadata(output).await?.len();
    if size == 0 {
        remove_partial(output).await;
        return Err(ConversionError::EmptyOutput(output.to_path_buf()));
    }
    Ok(())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_per_format() {
        let target = HeicTarget::Jpeg;
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Heic), target),
            ConversionPlan::HeicTo(HeicTarget::Jpeg)
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Heif), target),
            ConversionPlan::HeicTo(HeicTarget::Jpeg)
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Avif), target),
            ConversionPlan::PassThrough
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Png), target),
            ConversionPlan::ToAvif
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Jpeg), target),
            ConversionPlan::ToAvif
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Pdf), target),
            ConversionPlan::None
        );
        assert_eq!(
            ConversionPlan::for_format(Some(SupportedFormat::Mp3), target),
            ConversionPlan::None
        );
        assert_eq!(ConversionPlan::for_format(None, target), ConversionPlan::None);
    }

    #[tokio::test]
    async fn test_empty_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("blank.avif");
        std::fs::write(&output, b"").unwrap();

        let result = ensure_non_empty(&output).await;

        assert!(matches!(result, Err(ConversionError::EmptyOutput(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/in/photo.heic")), "photo");
        assert_eq!(file_stem(Path::new("/in/archive.tar.gz")), "archive.tar");
    }
}
