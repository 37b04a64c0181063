//! Extension classification and content sniffing
//!
//! Extensions decide which files the scanner picks up. Everything after that
//! (converter branch, extractor branch, managed file name) is decided by the
//! sniffed content type, so a renamed file cannot send the pipeline down the
//! wrong path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::Result;

/// Number of leading bytes inspected when sniffing
pub const SNIFF_LEN: u64 = 8 * 1024;

/// Extension used when the content type has no canonical mapping
pub const UNKNOWN_EXTENSION: &str = ".unknown";

/// Broad media category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Pdf,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Pdf => "pdf",
            MediaKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Every format the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFormat {
    Png,
    Jpeg,
    Mp3,
    Pdf,
    Avif,
    Heic,
    Heif,
}

impl SupportedFormat {
    /// Case-insensitive lookup; accepts the extension with or without a dot
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "mp3" => Some(Self::Mp3),
            "pdf" => Some(Self::Pdf),
            "avif" => Some(Self::Avif),
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "audio/mpeg" => Some(Self::Mp3),
            "application/pdf" => Some(Self::Pdf),
            "image/avif" => Some(Self::Avif),
            "image/heic" => Some(Self::Heic),
            "image/heif" => Some(Self::Heif),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Mp3 => "audio/mpeg",
            Self::Pdf => "application/pdf",
            Self::Avif => "image/avif",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Png | Self::Jpeg | Self::Avif | Self::Heic | Self::Heif => MediaKind::Image,
            Self::Mp3 => MediaKind::Audio,
            Self::Pdf => MediaKind::Pdf,
        }
    }

    /// Canonical extension, with the leading dot
    pub fn canonical_extension(&self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Mp3 => ".mp3",
            Self::Pdf => ".pdf",
            Self::Avif => ".avif",
            Self::Heic => ".heic",
            Self::Heif => ".heif",
        }
    }

    /// Formats that are already conversion targets or need a dedicated
    /// decoder. Base-name groups prefer any other member over these.
    pub fn is_conversion_sensitive(&self) -> bool {
        matches!(self, Self::Avif | Self::Heic | Self::Heif)
    }
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub supported: bool,
    pub kind: MediaKind,
    pub format: Option<SupportedFormat>,
}

/// Classify a path by its extension alone.
pub fn classify(path: &Path) -> Classification {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(SupportedFormat::from_extension);

    Classification {
        supported: format.is_some(),
        kind: format.map(|f| f.kind()).unwrap_or(MediaKind::Unknown),
        format,
    }
}

/// Content type detected from leading bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffedType {
    pub mime: String,
    pub format: Option<SupportedFormat>,
}

impl SniffedType {
    fn new(mime: impl Into<String>) -> Self {
        let mime = mime.into();
        let format = SupportedFormat::from_mime(&mime);
        Self { mime, format }
    }

    pub fn kind(&self) -> MediaKind {
        self.format.map(|f| f.kind()).unwrap_or(MediaKind::Unknown)
    }

    pub fn canonical_extension(&self) -> &'static str {
        canonical_extension(&self.mime)
    }
}

/// Major brand of an ISO-BMFF `ftyp` box
fn ftyp_brand(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        Some(&bytes[8..12])
    } else {
        None
    }
}

/// Detect the content type of a buffer.
///
/// HEIF-family containers are resolved from the `ftyp` brand so HEIC, HEIF
/// and AVIF are told apart; everything else goes through `infer`.
pub fn sniff(bytes: &[u8]) -> Option<SniffedType> {
    if let Some(brand) = ftyp_brand(bytes) {
        match brand {
            b"avif" | b"avis" => return Some(SniffedType::new("image/avif")),
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => {
                return Some(SniffedType::new("image/heic"))
            }
            b"mif1" | b"msf1" => return Some(SniffedType::new("image/heif")),
            _ => {}
        }
    }

    infer::get(bytes).map(|kind| SniffedType::new(kind.mime_type()))
}

/// Sniff the first [`SNIFF_LEN`] bytes of a file.
pub async fn sniff_file(path: &Path) -> Result<Option<SniffedType>> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).await?;
    Ok(sniff(&head))
}

/// Map a MIME type to the extension used inside managed storage.
pub fn canonical_extension(mime: &str) -> &'static str {
    SupportedFormat::from_mime(mime)
        .map(|format| format.canonical_extension())
        .unwrap_or(UNKNOWN_EXTENSION)
}

/// Effective format of a file: the sniffed type when it maps to a supported
/// format, otherwise the extension.
pub fn resolve_format(sniffed: Option<&SniffedType>, path: &Path) -> Option<SupportedFormat> {
    sniffed
        .and_then(|s| s.format)
        .or_else(|| classify(path).format)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEAD: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const HEIC_HEAD: &[u8] = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic";
    const HEIF_HEAD: &[u8] = b"\0\0\0\x18ftypmif1\0\0\0\0mif1heic";
    const AVIF_HEAD: &[u8] = b"\0\0\0\x1cftypavif\0\0\0\0avifmif1miaf";

    #[test]
    fn test_classify_supported_extensions() {
        let cases = [
            ("a.png", MediaKind::Image),
            ("a.JPG", MediaKind::Image),
            ("a.jpeg", MediaKind::Image),
            ("a.mp3", MediaKind::Audio),
            ("a.pdf", MediaKind::Pdf),
            ("a.avif", MediaKind::Image),
            ("a.HEIC", MediaKind::Image),
            ("a.heif", MediaKind::Image),
        ];

        for (name, kind) in cases {
            let classification = classify(Path::new(name));
            assert!(classification.supported, "{} should be supported", name);
            assert_eq!(classification.kind, kind, "{}", name);
        }
    }

    #[test]
    fn test_classify_unsupported() {
        for name in ["a.txt", "a.gif", "README", ".hidden"] {
            let classification = classify(Path::new(name));
            assert!(!classification.supported, "{}", name);
            assert_eq!(classification.kind, MediaKind::Unknown);
            assert_eq!(classification.format, None);
        }
    }

    #[test]
    fn test_sniff_distinguishes_heif_family() {
        assert_eq!(sniff(HEIC_HEAD).unwrap().mime, "image/heic");
        assert_eq!(sniff(HEIF_HEAD).unwrap().mime, "image/heif");
        assert_eq!(sniff(AVIF_HEAD).unwrap().format, Some(SupportedFormat::Avif));
    }

    #[test]
    fn test_sniff_common_types() {
        assert_eq!(sniff(PNG_HEAD).unwrap().format, Some(SupportedFormat::Png));
        assert_eq!(sniff(JPEG_HEAD).unwrap().format, Some(SupportedFormat::Jpeg));
        assert_eq!(
            sniff(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n").unwrap().format,
            Some(SupportedFormat::Pdf)
        );
        assert!(sniff(b"plain text").is_none());
    }

    #[test]
    fn test_canonical_extension_table() {
        assert_eq!(canonical_extension("image/jpeg"), ".jpg");
        assert_eq!(canonical_extension("image/png"), ".png");
        assert_eq!(canonical_extension("image/heic"), ".heic");
        assert_eq!(canonical_extension("image/heif"), ".heif");
        assert_eq!(canonical_extension("image/avif"), ".avif");
        assert_eq!(canonical_extension("application/zip"), ".unknown");
    }

    #[test]
    fn test_sniff_wins_over_lying_extension() {
        let sniffed = sniff(PNG_HEAD);
        let format = resolve_format(sniffed.as_ref(), Path::new("renamed.heic"));
        assert_eq!(format, Some(SupportedFormat::Png));

        // No sniff result: fall back to the extension
        assert_eq!(
            resolve_format(None, Path::new("track.mp3")),
            Some(SupportedFormat::Mp3)
        );
    }

    #[test]
    fn test_conversion_sensitive_formats() {
        assert!(SupportedFormat::Avif.is_conversion_sensitive());
        assert!(SupportedFormat::Heic.is_conversion_sensitive());
        assert!(SupportedFormat::Heif.is_conversion_sensitive());
        assert!(!SupportedFormat::Png.is_conversion_sensitive());
        assert!(!SupportedFormat::Pdf.is_conversion_sensitive());
    }

    #[tokio::test]
    async fn test_sniff_file_reads_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.heic");
        std::fs::write(&path, HEIC_HEAD).unwrap();

        let sniffed = sniff_file(&path).await.unwrap().unwrap();
        assert_eq!(sniffed.format, Some(SupportedFormat::Heic));
        assert_eq!(sniffed.kind(), MediaKind::Image);
        assert_eq!(sniffed.canonical_extension(), ".heic");
    }
}
