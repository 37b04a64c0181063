//! Integration tests for managed copies and renditions

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{DecodedImage, HeifDecoder};
use core_library::{sniff_file, SupportedFormat};
use core_media::{ByteCopier, ConversionError, FormatConverter};
use core_runtime::config::{EncodingSettings, HeicTarget};
use mockall::mock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Decoder {}

    impl HeifDecoder for Decoder {
        fn decode(&self, bytes: &[u8]) -> BridgeResult<DecodedImage>;
    }
}

/// Writes only the first half of the source
struct TruncatingCopier;

#[async_trait]
impl ByteCopier for TruncatingCopier {
    async fn copy(&self, from: &Path, to: &Path) -> std::io::Result<u64> {
        let bytes = tokio::fs::read(from).await?;
        let half = &bytes[..bytes.len() / 2];
        tokio::fs::write(to, half).await?;
        Ok(half.len() as u64)
    }
}

fn fast_settings() -> EncodingSettings {
    EncodingSettings {
        avif_speed: 10,
        ..EncodingSettings::default()
    }
}

fn converter(decoder: MockDecoder) -> FormatConverter {
    FormatConverter::new(Arc::new(decoder), fast_settings())
}

fn unused_decoder() -> MockDecoder {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().never();
    decoder
}

fn red_decoder() -> MockDecoder {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().returning(|_| {
        Ok(DecodedImage {
            width: 8,
            height: 8,
            rgba: [255u8, 0, 0, 255].repeat(64),
        })
    });
    decoder
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([10, 120, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

fn dirs() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_copy_keeps_bytes_and_sniffed_extension() {
    let (source_dir, managed) = dirs();
    let source = write_png(source_dir.path(), "image.png");

    let copy = converter(unused_decoder())
        .copy_to_managed(&source, managed.path())
        .await
        .unwrap();

    assert_eq!(copy.path, managed.path().join("image.png"));
    assert_eq!(copy.mime.as_deref(), Some("image/png"));
    assert_eq!(copy.format, Some(SupportedFormat::Png));
    assert_eq!(
        std::fs::read(&copy.path).unwrap(),
        std::fs::read(&source).unwrap()
    );
}

#[tokio::test]
async fn test_source_inside_managed_storage_is_left_alone() {
    let managed = TempDir::new().unwrap();
    let source = write_png(managed.path(), "image.png");
    let original = std::fs::read(&source).unwrap();

    let copy = converter(unused_decoder())
        .with_copier(Arc::new(TruncatingCopier))
        .copy_to_managed(&source, managed.path())
        .await
        .unwrap();

    assert_eq!(copy.path, source);
    assert_eq!(copy.format, Some(SupportedFormat::Png));
    assert_eq!(std::fs::read(&source).unwrap(), original);
}

#[tokio::test]
async fn test_renamed_png_is_stored_as_png() {
    let (source_dir, managed) = dirs();
    let source = write_png(source_dir.path(), "photo.heic");

    let copy = converter(unused_decoder())
        .copy_to_managed(&source, managed.path())
        .await
        .unwrap();

    assert_eq!(copy.path, managed.path().join("photo.png"));
    assert_eq!(copy.format, Some(SupportedFormat::Png));
}

#[tokio::test]
async fn test_truncated_copy_is_integrity_error_and_removed() {
    let (source_dir, managed) = dirs();
    let source = write_png(source_dir.path(), "image.png");

    let result = converter(unused_decoder())
        .with_copier(Arc::new(TruncatingCopier))
        .copy_to_managed(&source, managed.path())
        .await;

    match result {
        Err(ConversionError::Integrity {
            expected, copied, ..
        }) => assert!(copied < expected),
        other => panic!("expected integrity error, got {:?}", other),
    }
    assert!(file_names(managed.path()).is_empty());
}

#[tokio::test]
async fn test_png_converts_to_avif() {
    let (source_dir, managed) = dirs();
    let source = write_png(source_dir.path(), "image.png");
    let converter = converter(unused_decoder());

    let copy = converter
        .copy_to_managed(&source, managed.path())
        .await
        .unwrap();
    let converted = converter
        .convert(&copy, managed.path())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(converted, managed.path().join("image.avif"));
    assert!(std::fs::metadata(&converted).unwrap().len() > 0);
    let sniffed = sniff_file(&converted).await.unwrap().unwrap();
    assert_eq!(sniffed.format, Some(SupportedFormat::Avif));
    assert_eq!(file_names(managed.path()), vec!["image.avif", "image.png"]);
}

#[tokio::test]
async fn test_undecodable_raster_leaves_no_output() {
    let (source_dir, managed) = dirs();
    let source = source_dir.path().join("broken.png");
    std::fs::write(&source, b"\x89PNG\r\n\x1a\n but then garbage").unwrap();

    let result = converter(unused_decoder())
        .convert_to_avif(&source, managed.path())
        .await;

    assert!(matches!(result, Err(ConversionError::Image(_))));
    assert!(file_names(managed.path()).is_empty());
}

#[tokio::test]
async fn test_heic_to_avif_and_jpeg() {
    let (source_dir, managed) = dirs();
    let source = source_dir.path().join("photo.heic");
    std::fs::write(&source, b"\0\0\0\x18ftypheic\0\0\0\0mif1heic").unwrap();

    let avif = converter(red_decoder())
        .convert_heic(&source, managed.path(), HeicTarget::Avif)
        .await
        .unwrap();
    assert_eq!(avif, managed.path().join("photo.avif"));
    assert!(std::fs::metadata(&avif).unwrap().len() > 0);

    let jpeg = converter(red_decoder())
        .convert_heic(&source, managed.path(), HeicTarget::Jpeg)
        .await
        .unwrap();
    assert_eq!(jpeg, managed.path().join("photo.jpg"));
    let decoded = image::open(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 8));
}

#[tokio::test]
async fn test_heic_decode_failure_returns_none() {
    let (source_dir, managed) = dirs();
    let source = source_dir.path().join("photo.heic");
    std::fs::write(&source, b"not really heic").unwrap();

    let mut decoder = MockDecoder::new();
    decoder
        .expect_decode()
        .returning(|_| Err(BridgeError::NotAvailable("no libheif".to_string())));

    let converted = converter(decoder)
        .convert_heic(&source, managed.path(), HeicTarget::Avif)
        .await;

    assert!(converted.is_none());
    assert!(file_names(managed.path()).is_empty());
}

#[tokio::test]
async fn test_inconsistent_decode_returns_none() {
    let (source_dir, managed) = dirs();
    let source = source_dir.path().join("photo.heif");
    std::fs::write(&source, b"heif").unwrap();

    let mut decoder = MockDecoder::new();
    decoder.expect_decode().returning(|_| {
        Ok(DecodedImage {
            width: 100,
            height: 100,
            rgba: vec![0; 16],
        })
    });

    let converted = converter(decoder)
        .convert_heic(&source, managed.path(), HeicTarget::Jpeg)
        .await;

    assert!(converted.is_none());
    assert!(file_names(managed.path()).is_empty());
}

#[tokio::test]
async fn test_avif_passes_through_and_pdf_has_no_rendition() {
    let (source_dir, managed) = dirs();
    let avif = source_dir.path().join("photo.avif");
    std::fs::write(&avif, b"\0\0\0\x1cftypavif\0\0\0\0avifmif1miaf").unwrap();
    let pdf = source_dir.path().join("notes.pdf");
    std::fs::write(&pdf, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n").unwrap();
    let converter = converter(unused_decoder());

    let avif_copy = converter
        .copy_to_managed(&avif, managed.path())
        .await
        .unwrap();
    assert_eq!(
        converter.convert(&avif_copy, managed.path()).await.unwrap(),
        Some(avif_copy.path.clone())
    );

    let pdf_copy = converter
        .copy_to_managed(&pdf, managed.path())
        .await
        .unwrap();
    assert_eq!(pdf_copy.path, managed.path().join("notes.pdf"));
    assert_eq!(converter.convert(&pdf_copy, managed.path()).await.unwrap(), None);
}
