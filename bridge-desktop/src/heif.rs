//! HEIC/HEIF decoding

use bridge_traits::{
    error::{BridgeError, Result},
    imaging::{DecodedImage, HeifDecoder},
};
use std::sync::Arc;

/// Decoder used when the crate is built without the `heif` feature.
///
/// Every decode fails with [`BridgeError::NotAvailable`], which the converter
/// reports as a per-file conversion failure.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedHeifDecoder;

impl HeifDecoder for UnsupportedHeifDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage> {
        Err(BridgeError::NotAvailable(
            "HEIF decoding requires the 'heif' feature (libheif)".to_string(),
        ))
    }
}

/// libheif-backed decoder
#[cfg(feature = "heif")]
#[derive(Debug, Clone, Default)]
pub struct LibHeifDecoder;

#[cfg(feature = "heif")]
impl LibHeifDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "heif")]
impl HeifDecoder for LibHeifDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let failed = |e: libheif_rs::HeifError| {
            BridgeError::OperationFailed(format!("HEIF decode failed: {}", e))
        };

        let lib_heif = LibHeif::new();
        let context = HeifContext::read_from_bytes(bytes).map_err(failed)?;
        let handle = context.primary_image_handle().map_err(failed)?;
        let image = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
            .map_err(failed)?;

        let planes = image.planes();
        let plane = planes.interleaved.ok_or_else(|| {
            BridgeError::OperationFailed("HEIF image has no interleaved plane".to_string())
        })?;

        let width = plane.width;
        let height = plane.height;
        let row_len = width as usize * 4;
        let mut rgba = Vec::with_capacity(row_len * height as usize);
        for row in plane.data.chunks(plane.stride).take(height as usize) {
            rgba.extend_from_slice(&row[..row_len.min(row.len())]);
        }

        Ok(DecodedImage {
            width,
            height,
            rgba,
        })
    }
}

/// Best decoder available in this build
pub fn default_heif_decoder() -> Arc<dyn HeifDecoder> {
    #[cfg(feature = "heif")]
    {
        Arc::new(LibHeifDecoder::new())
    }

    #[cfg(not(feature = "heif"))]
    {
        Arc::new(UnsupportedHeifDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_decoder_reports_not_available() {
        let err = UnsupportedHeifDecoder.decode(b"ftypheic").unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[test]
    fn test_default_decoder_rejects_garbage() {
        assert!(default_heif_decoder().decode(b"definitely not heif").is_err());
    }
}
