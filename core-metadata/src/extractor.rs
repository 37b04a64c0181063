//! Attribute Extraction
//!
//! Pulls every raw metadata source for one file into a [`RawTree`]:
//!
//! - `basic`: the generic tag reader (EXIF, XMP, file-system group)
//! - `extended`: OS extended attributes, with the provenance attribute
//!   decoded from its binary plist
//! - `systemInfo`: a description of the host
//! - `audio` / `pdf`: kind-specific properties
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::AttributeExtractor;
//!
//! let extractor = AttributeExtractor::from_config(&config);
//! let tree = extractor.extract(Path::new("song.mp3"), MediaKind::Audio).await?;
//! assert!(tree.contains_key("audio"));
//! ```

use bridge_traits::{ExtendedAttributes, RawTree, RawValue, SystemInfoProvider, TagReader};
use core_library::MediaKind;
use core_runtime::config::IngestConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::audio::read_audio;
use crate::error::{MetadataError, Result};
use crate::pdf::read_pdf_properties;
use crate::provenance::{parse_provenance, PROVENANCE_ATTRIBUTE};

/// Kind-specific extraction step, chosen from the sniffed media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionBranch {
    Audio,
    Pdf,
    Image,
    Unsupported,
}

impl ExtractionBranch {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => Self::Audio,
            MediaKind::Pdf => Self::Pdf,
            MediaKind::Image => Self::Image,
            MediaKind::Unknown => Self::Unsupported,
        }
    }
}

/// Collects raw metadata through the injected ports.
#[derive(Clone)]
pub struct AttributeExtractor {
    tag_reader: Arc<dyn TagReader>,
    attributes: Arc<dyn ExtendedAttributes>,
    system_info: Arc<dyn SystemInfoProvider>,
    tag_read_timeout: Duration,
}

impl AttributeExtractor {
    pub fn new(
        tag_reader: Arc<dyn TagReader>,
        attributes: Arc<dyn ExtendedAttributes>,
        system_info: Arc<dyn SystemInfoProvider>,
        tag_read_timeout: Duration,
    ) -> Self {
        Self {
            tag_reader,
            attributes,
            system_info,
            tag_read_timeout,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            Arc::clone(&config.tag_reader),
            Arc::clone(&config.extended_attributes),
            Arc::clone(&config.system_info),
            config.tag_read_timeout,
        )
    }

    /// Extract the raw metadata tree of `path`.
    ///
    /// # Errors
    ///
    /// A tag-reader failure or timeout fails the whole file, as does an
    /// unreadable audio or PDF payload. Attribute and system-info failures
    /// are absorbed with `""` placeholders.
    pub async fn extract(&self, path: &Path, kind: MediaKind) -> Result<RawTree> {
        let branch = ExtractionBranch::for_kind(kind);

        let (basic, extended, system_info) = tokio::join!(
            self.read_basic(path),
            self.read_extended(path),
            self.read_system_info()
        );

        let mut tree = RawTree::new();
        tree.insert("basic".to_string(), RawValue::Map(basic?));
        tree.insert("extended".to_string(), RawValue::Map(extended));
        tree.insert("systemInfo".to_string(), system_info);

        match branch {
            ExtractionBranch::Audio => {
                let owned = path.to_path_buf();
                let audio = tokio::task::spawn_blocking(move || read_audio(&owned))
                    .await
                    .map_err(|e| MetadataError::ExtractionFailed(e.to_string()))??;
                tree.insert("audio".to_string(), RawValue::Map(audio));
            }
            ExtractionBranch::Pdf => {
                let bytes = tokio::fs::read(path).await?;
                let pdf = tokio::task::spawn_blocking(move || read_pdf_properties(&bytes))
                    .await
                    .map_err(|e| MetadataError::ExtractionFailed(e.to_string()))??;
                tree.insert("pdf".to_string(), RawValue::Map(pdf));
            }
            ExtractionBranch::Image => {
                debug!(path = %path.display(), "Image metadata covered by the tag reader");
            }
            ExtractionBranch::Unsupported => {}
        }

        debug!(
            path = %path.display(),
            branch = ?branch,
            sections = tree.len(),
            "Extracted raw metadata"
        );

        Ok(tree)
    }

    async fn read_basic(&self, path: &Path) -> Result<RawTree> {
        match tokio::time::timeout(self.tag_read_timeout, self.tag_reader.read(path)).await {
            Ok(Ok(tags)) => Ok(tags),
            Ok(Err(e)) => Err(MetadataError::ExtractionFailed(format!(
                "{} failed on {}: {}",
                self.tag_reader.name(),
                path.display(),
                e
            ))),
            Err(_) => Err(MetadataError::TagReadTimeout {
                path: path.to_path_buf(),
                timeout: self.tag_read_timeout,
            }),
        }
    }

    async fn read_extended(&self, path: &Path) -> RawTree {
        let mut extended = RawTree::new();

        let names = match self.attributes.list(path).await {
            Ok(names) => names,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Listing extended attributes failed");
                return extended;
            }
        };

        for name in names {
            let value = match self.attributes.get(path, &name).await {
                Ok(Some(bytes)) if name == PROVENANCE_ATTRIBUTE => RawValue::Provenance(Box::new(
                    parse_provenance(path, &name, bytes).await,
                )),
                Ok(Some(bytes)) => RawValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        attr = %name,
                        error = %e,
                        "Reading extended attribute failed"
                    );
                    RawValue::text("")
                }
            };
            extended.insert(name, value);
        }

        extended
    }

    async fn read_system_info(&self) -> RawValue {
        match self.system_info.describe().await {
            Ok(description) => RawValue::Text(description),
            Err(e) => {
                warn!(error = %e, "System info unavailable");
                RawValue::text("")
            }
        }
    }
}
