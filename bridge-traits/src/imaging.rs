//! Image Decoding Port
//!
//! HEIC/HEIF containers need a dedicated decoder before the generic raster
//! encoders can process them.

use crate::error::Result;

/// Interleaved 8-bit RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Whether the buffer length matches the dimensions
    pub fn is_consistent(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() == self.width as usize * self.height as usize * 4
    }
}

/// HEIC/HEIF decoder.
///
/// Decoding is CPU bound and synchronous; callers run it on a blocking thread.
pub trait HeifDecoder: Send + Sync {
    /// Decode the primary image of a HEIF container
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_image_consistency() {
        let ok = DecodedImage {
            width: 2,
            height: 1,
            rgba: vec![0; 8],
        };
        assert!(ok.is_consistent());

        let short = DecodedImage {
            width: 2,
            height: 2,
            rgba: vec![0; 8],
        };
        assert!(!short.is_consistent());
    }
}
