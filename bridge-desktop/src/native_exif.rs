//! In-process tag reader using `kamadak-exif` and file system stats

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    metadata::TagReader,
    value::{RawTree, RawValue},
};
use chrono::{DateTime, Local};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S%:z";

/// Reads the `File` group from file system stats and the `EXIF` group from
/// the primary IFD of any container `kamadak-exif` understands.
///
/// Output mirrors the group layout of [`ExifToolReader`](crate::ExifToolReader),
/// so it can stand in when exiftool is not installed.
#[derive(Debug, Clone, Default)]
pub struct NativeExifReader;

impl NativeExifReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TagReader for NativeExifReader {
    async fn read(&self, path: &Path) -> Result<RawTree> {
        let stats = fs::metadata(path).await?;
        let data = fs::read(path).await?;
        let mut tree = RawTree::new();
        tree.insert(
            "File".to_string(),
            RawValue::Map(file_group(path, &stats, infer::get(&data))),
        );

        match read_exif_group(&data) {
            Some(group) if !group.is_empty() => {
                tree.insert("EXIF".to_string(), RawValue::Map(group));
            }
            _ => debug!(path = %path.display(), "No EXIF block found"),
        }

        Ok(tree)
    }

    fn name(&self) -> &'static str {
        "kamadak-exif"
    }
}

fn format_time(time: SystemTime) -> RawValue {
    RawValue::Text(DateTime::<Local>::from(time).format(EXIF_DATE_FORMAT).to_string())
}

/// exiftool's `FileType` label for a sniffed extension
fn file_type_label(extension: &str) -> String {
    match extension {
        "jpg" => "JPEG".to_string(),
        "tif" => "TIFF".to_string(),
        other => other.to_uppercase(),
    }
}

fn file_group(path: &Path, stats: &std::fs::Metadata, sniffed: Option<infer::Type>) -> RawTree {
    let mut group = RawTree::new();

    if let Some(name) = path.file_name() {
        group.insert(
            "FileName".to_string(),
            RawValue::text(name.to_string_lossy()),
        );
    }
    if let Some(parent) = path.parent() {
        group.insert(
            "Directory".to_string(),
            RawValue::text(parent.to_string_lossy()),
        );
    }
    group.insert(
        "FileSize".to_string(),
        RawValue::Integer(i64::try_from(stats.len()).unwrap_or(i64::MAX)),
    );
    match sniffed {
        Some(kind) => {
            group.insert(
                "FileType".to_string(),
                RawValue::text(file_type_label(kind.extension())),
            );
            group.insert(
                "FileTypeExtension".to_string(),
                RawValue::text(kind.extension()),
            );
            group.insert("MIMEType".to_string(), RawValue::text(kind.mime_type()));
        }
        None => {
            if let Some(extension) = path.extension() {
                group.insert(
                    "FileTypeExtension".to_string(),
                    RawValue::text(extension.to_string_lossy().to_lowercase()),
                );
            }
        }
    }
    if let Ok(modified) = stats.modified() {
        group.insert("FileModifyDate".to_string(), format_time(modified));
    }
    if let Ok(accessed) = stats.accessed() {
        group.insert("FileAccessDate".to_string(), format_time(accessed));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        if let Some(changed) = DateTime::from_timestamp(stats.ctime(), stats.ctime_nsec() as u32)
        {
            group.insert(
                "FileInodeChangeDate".to_string(),
                RawValue::Text(
                    changed
                        .with_timezone(&Local)
                        .format(EXIF_DATE_FORMAT)
                        .to_string(),
                ),
            );
        }
        group.insert(
            "FilePermissions".to_string(),
            RawValue::text(format!("{:o}", stats.mode() & 0o7777)),
        );
    }

    group
}

fn read_exif_group(data: &[u8]) -> Option<RawTree> {
    let mut reader = exif::Reader::new();
    reader.continue_on_error(true);
    let mut cursor = Cursor::new(data);

    let exif = reader
        .read_from_container(&mut cursor)
        .or_else(|e| e.distill_partial_result(|_| {}))
        .ok()?;

    let mut group = RawTree::new();
    for field in exif.fields().filter(|f| f.ifd_num == exif::In::PRIMARY) {
        group.insert(field.tag.to_string(), field_value(field, &exif));
    }
    Some(group)
}

fn field_value(field: &exif::Field, exif: &exif::Exif) -> RawValue {
    match &field.value {
        exif::Value::Ascii(parts) => RawValue::Text(
            parts
                .iter()
                .map(|part| {
                    String::from_utf8_lossy(part)
                        .trim_end_matches('\0')
                        .trim()
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        exif::Value::Byte(v) if v.len() == 1 => RawValue::Integer(i64::from(v[0])),
        exif::Value::Short(v) if v.len() == 1 => RawValue::Integer(i64::from(v[0])),
        exif::Value::Long(v) if v.len() == 1 => RawValue::Integer(i64::from(v[0])),
        exif::Value::SShort(v) if v.len() == 1 => RawValue::Integer(i64::from(v[0])),
        exif::Value::SLong(v) if v.len() == 1 => RawValue::Integer(i64::from(v[0])),
        exif::Value::Rational(v) if v.len() == 1 => RawValue::Float(v[0].to_f64()),
        exif::Value::SRational(v) if v.len() == 1 => RawValue::Float(v[0].to_f64()),
        _ => RawValue::Text(field.display_value().with_unit(exif).to_string()),
    }
}

/// Tries `primary` first and switches to `fallback` when the primary reports
/// the capability as unavailable (e.g. exiftool is not installed).
pub struct FallbackTagReader {
    primary: Arc<dyn TagReader>,
    fallback: Arc<dyn TagReader>,
}

impl FallbackTagReader {
    pub fn new(primary: Arc<dyn TagReader>, fallback: Arc<dyn TagReader>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl TagReader for FallbackTagReader {
    async fn read(&self, path: &Path) -> Result<RawTree> {
        match self.primary.read(path).await {
            Err(BridgeError::NotAvailable(reason)) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    reason = %reason,
                    "Tag reader unavailable, using fallback"
                );
                self.fallback.read(path).await
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct UnavailableReader;

    #[async_trait]
    impl TagReader for UnavailableReader {
        async fn read(&self, _path: &Path) -> Result<RawTree> {
            Err(BridgeError::NotAvailable("missing".to_string()))
        }
    }

    #[tokio::test]
    async fn test_reads_file_group_for_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        let size = std::fs::metadata(&path).unwrap().len() as i64;

        let tree = NativeExifReader::new().read(&path).await.unwrap();

        let file = tree["File"].as_map().unwrap();
        assert_eq!(file["FileName"], RawValue::text("pixel.png"));
        assert_eq!(file["FileSize"], RawValue::Integer(size));
        assert_eq!(file["FileTypeExtension"], RawValue::text("png"));
        assert_eq!(file["FileType"], RawValue::text("PNG"));
        assert_eq!(file["MIMEType"], RawValue::text("image/png"));
        assert!(file.contains_key("FileModifyDate"));
        assert!(!tree.contains_key("EXIF"));
    }

    #[tokio::test]
    async fn test_file_type_follows_content_not_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.png");
        RgbImage::from_pixel(2, 2, Rgb([200, 100, 0]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();

        let tree = NativeExifReader::new().read(&path).await.unwrap();

        let file = tree["File"].as_map().unwrap();
        assert_eq!(file["FileType"], RawValue::text("JPEG"));
        assert_eq!(file["FileTypeExtension"], RawValue::text("jpg"));
        assert_eq!(file["MIMEType"], RawValue::text("image/jpeg"));
    }

    #[tokio::test]
    async fn test_unrecognised_content_has_no_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, b"plain words").unwrap();

        let tree = NativeExifReader::new().read(&path).await.unwrap();

        let file = tree["File"].as_map().unwrap();
        assert_eq!(file["FileTypeExtension"], RawValue::text("txt"));
        assert!(!file.contains_key("FileType"));
        assert!(!file.contains_key("MIMEType"));
    }

    #[test]
    fn test_file_type_labels() {
        assert_eq!(file_type_label("jpg"), "JPEG");
        assert_eq!(file_type_label("heic"), "HEIC");
        assert_eq!(file_type_label("pdf"), "PDF");
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let result = NativeExifReader::new()
            .read(Path::new("/nonexistent/file.jpg"))
            .await;
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let reader = FallbackTagReader::new(
            Arc::new(UnavailableReader),
            Arc::new(NativeExifReader::new()),
        );
        let tree = reader.read(&path).await.unwrap();

        let file = tree["File"].as_map().unwrap();
        assert_eq!(file["FileSize"], RawValue::Integer(5));
    }
}
