//! # Batch Orchestrator
//!
//! Drives one ingestion run over a source directory.
//!
//! ## Overview
//!
//! A run:
//! - Verifies the source directory and creates managed storage
//! - Scans and groups candidates, keeping one representative per base name
//! - Hashes every candidate, bounded by `max_concurrent`
//! - Drops repeated content, first occurrence in scan order wins
//! - Copies, converts, extracts and normalizes the accepted files in parallel
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Ingestor         │
//! │ - IngestConfig   │
//! └────────┬─────────┘
//!          │
//!          ├──> DirectoryScanner   (candidates in scan order)
//!          ├──> hash_file          (bounded, order kept)
//!          ├──> DigestSet          (sequential dedupe)
//!          ├──> FormatConverter    (managed copy + rendition)
//!          ├──> AttributeExtractor (raw tree from the original)
//!          └──> LoggerSink         (failures and skips)
//! ```
//!
//! Only a missing source directory or unusable managed storage abort the
//! run. Any other problem costs the affected file its result and is reported
//! through tracing, the logger sink, and [`IngestReport::failures`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_ingest::Ingestor;
//! use core_runtime::config::IngestConfig;
//!
//! let ingestor = Ingestor::new(IngestConfig::builder().build()?)?;
//! let results = ingestor.run(Path::new("/photos/inbox")).await?;
//! let ids = ingestor.persist(&results).await?;
//! ```

use bridge_traits::{LogEntry, LogLevel, RecordId, RecordPatch};
use core_library::{hash_file, ContentDigest, DigestCheck, DigestSet, DirectoryScanner, FileCandidate};
use core_media::FormatConverter;
use core_metadata::{normalize, AttributeExtractor};
use core_runtime::config::IngestConfig;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::{IngestError, Result};
use crate::record::{build_record, StoredRecord};
use crate::report::{FailureStage, IngestFailure, IngestReport, IngestResult, SkipReason, SkippedFile};

const LOG_TARGET: &str = "core_ingest";

/// Per-file work shared by the spawned tasks
struct Pipeline {
    managed_dir: PathBuf,
    converter: FormatConverter,
    extractor: AttributeExtractor,
}

impl Pipeline {
    async fn process(
        &self,
        candidate: FileCandidate,
        digest: ContentDigest,
    ) -> std::result::Result<IngestResult, IngestFailure> {
        let source = candidate.path.as_path();

        let copy = self
            .converter
            .copy_to_managed(source, &self.managed_dir)
            .await
            .map_err(|e| failure(source, FailureStage::Copy, e))?;

        let converted_path = self
            .converter
            .convert(&copy, &self.managed_dir)
            .await
            .map_err(|e| failure(source, FailureStage::Convert, e))?;

        // Branch on what the bytes are, not what the name claims
        let kind = copy.format.unwrap_or(candidate.format).kind();

        let tree = self
            .extractor
            .extract(source, kind)
            .await
            .map_err(|e| failure(source, FailureStage::Extract, e))?;
        let metadata = normalize(tree);

        debug!(
            path = %source.display(),
            managed = %copy.path.display(),
            kind = %kind,
            fields = metadata.len(),
            "File ingested"
        );

        Ok(IngestResult {
            original_path: candidate.path,
            managed_path: copy.path,
            converted_path,
            kind,
            metadata,
            content_digest: digest,
            processed: 0,
        })
    }
}

fn failure(path: &Path, stage: FailureStage, error: impl Display) -> IngestFailure {
    IngestFailure {
        path: path.to_path_buf(),
        stage,
        message: error.to_string(),
    }
}

/// Runs ingestion batches against one configuration.
pub struct Ingestor {
    config: IngestConfig,
    scanner: DirectoryScanner,
    pipeline: Arc<Pipeline>,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;

        let pipeline = Pipeline {
            managed_dir: config.managed_dir.clone(),
            converter: FormatConverter::from_config(&config),
            extractor: AttributeExtractor::from_config(&config),
        };

        Ok(Self {
            scanner: DirectoryScanner::new(config.scan_mode)
                .excluding(config.managed_dir.clone()),
            pipeline: Arc::new(pipeline),
            config,
        })
    }

    /// Replace the converter, e.g. to inject a different byte copier
    pub fn with_converter(mut self, converter: FormatConverter) -> Self {
        self.pipeline = Arc::new(Pipeline {
            managed_dir: self.pipeline.managed_dir.clone(),
            converter,
            extractor: self.pipeline.extractor.clone(),
        });
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest `dir` and return the successful results in scan order.
    ///
    /// # Errors
    ///
    /// `DirectoryNotFound` and `ManagedStorage` only. Per-file failures are
    /// logged and omitted; use [`Ingestor::run_report`] to inspect them.
    pub async fn run(&self, dir: &Path) -> Result<Vec<IngestResult>> {
        Ok(self.run_report(dir).await?.results)
    }

    /// Ingest `dir` and return results, skips and failures.
    pub async fn run_report(&self, dir: &Path) -> Result<IngestReport> {
        ensure_source_dir(dir).await?;
        self.ensure_managed_dir().await?;

        let candidates = self.scanner.scan(dir).await.map_err(|e| match e {
            core_library::LibraryError::DirectoryNotFound(path) => {
                IngestError::DirectoryNotFound(path)
            }
            other => IngestError::Library(other),
        })?;

        info!(
            dir = %dir.display(),
            candidates = candidates.len(),
            max_concurrent = self.config.max_concurrent,
            "Starting ingestion run"
        );

        let digests = self.hash_all(&candidates).await?;

        let mut report = IngestReport::default();
        let mut failures: Vec<(usize, IngestFailure)> = Vec::new();
        let mut accepted = Vec::new();
        let seen = DigestSet::new();

        for (index, (candidate, hashed)) in candidates.into_iter().zip(digests).enumerate() {
            let digest = match hashed {
                Ok(digest) => digest,
                Err(message) => {
                    let failed = IngestFailure {
                        path: candidate.path,
                        stage: FailureStage::Hash,
                        message,
                    };
                    self.report_failure(&failed).await;
                    failures.push((index, failed));
                    continue;
                }
            };

            if let DigestCheck::Duplicate { first_seen } =
                seen.check_and_insert(&digest, &candidate.path).await
            {
                let skipped = SkippedFile {
                    path: candidate.path,
                    content_digest: digest,
                    reason: SkipReason::DuplicateInRun { first_seen },
                };
                self.report_skip(&skipped).await;
                report.skipped.push(skipped);
                continue;
            }

            if let Some(record_id) = self.known_to_store(&digest, &candidate.path).await {
                let skipped = SkippedFile {
                    path: candidate.path,
                    content_digest: digest,
                    reason: SkipReason::KnownToStore {
                        record_id: record_id.0,
                    },
                };
                self.report_skip(&skipped).await;
                report.skipped.push(skipped);
                continue;
            }

            accepted.push((index, candidate, digest));
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut handles = Vec::with_capacity(accepted.len());

        for (index, candidate, digest) in accepted {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| IngestError::Task(e.to_string()))?;
            let pipeline = Arc::clone(&self.pipeline);
            let path = candidate.path.clone();

            let handle = tokio::spawn(async move {
                let outcome = pipeline.process(candidate, digest).await;
                drop(permit);
                outcome
            });
            handles.push((index, path, handle));
        }

        for (index, path, handle) in handles {
            let failed = match handle.await {
                Ok(Ok(result)) => {
                    report.results.push(result);
                    continue;
                }
                Ok(Err(failed)) => failed,
                Err(e) => {
                    error!(error = %e, "Task panicked");
                    failure(&path, FailureStage::Task, e)
                }
            };
            self.report_failure(&failed).await;
            failures.push((index, failed));
        }

        failures.sort_by_key(|(index, _)| *index);
        report.failures = failures.into_iter().map(|(_, failed)| failed).collect();

        info!(
            dir = %dir.display(),
            ingested = report.results.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Ingestion run completed"
        );

        Ok(report)
    }

    /// Insert a record for every result.
    ///
    /// A failed insert is logged and the result left out of the returned list.
    pub async fn persist(&self, results: &[IngestResult]) -> Result<Vec<StoredRecord>> {
        let store = self
            .config
            .media_store
            .as_ref()
            .ok_or(IngestError::MissingCollaborator("media store"))?;

        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            match store.insert(build_record(result)).await {
                Ok(id) => {
                    debug!(path = %result.original_path.display(), id = %id, "Record stored");
                    stored.push(StoredRecord {
                        id,
                        original_path: result.original_path.clone(),
                    });
                }
                Err(e) => {
                    error!(
                        path = %result.original_path.display(),
                        error = %e,
                        "Failed to store record"
                    );
                }
            }
        }

        info!(stored = stored.len(), total = results.len(), "Records persisted");
        Ok(stored)
    }

    /// Count one more downstream pass over `result` and mirror it to the
    /// stored record.
    pub async fn mark_processed(&self, id: &RecordId, result: &mut IngestResult) -> Result<()> {
        let store = self
            .config
            .media_store
            .as_ref()
            .ok_or(IngestError::MissingCollaborator("media store"))?;

        result.mark_processed();
        let patch = RecordPatch {
            processed: Some(i64::from(result.processed)),
            ..RecordPatch::default()
        };
        store.patch(id, patch).await?;
        Ok(())
    }

    async fn ensure_managed_dir(&self) -> Result<()> {
        let managed_dir = &self.config.managed_dir;
        tokio::fs::create_dir_all(managed_dir)
            .await
            .map_err(|source| {
                error!(path = %managed_dir.display(), error = %source, "Cannot create managed storage");
                IngestError::ManagedStorage {
                    path: managed_dir.clone(),
                    source,
                }
            })
    }

    /// Digest every candidate; the output lines up with `candidates`.
    async fn hash_all(
        &self,
        candidates: &[FileCandidate],
    ) -> Result<Vec<std::result::Result<ContentDigest, String>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut handles = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| IngestError::Task(e.to_string()))?;
            let path = candidate.path.clone();

            handles.push(tokio::spawn(async move {
                let digest = hash_file(&path).await;
                drop(permit);
                digest
            }));
        }

        let mut digests = Vec::with_capacity(handles.len());
        for handle in handles {
            let digest = match handle.await {
                Ok(digest) => digest.map_err(|e| e.to_string()),
                Err(e) => {
                    error!(error = %e, "Task panicked");
                    Err(e.to_string())
                }
            };
            digests.push(digest);
        }

        Ok(digests)
    }

    async fn known_to_store(&self, digest: &ContentDigest, path: &Path) -> Option<RecordId> {
        if !self.config.check_store_for_duplicates {
            return None;
        }
        let store = self.config.media_store.as_ref()?;

        match store.find_by_digest(digest.as_str()).await {
            Ok(found) => found,
            Err(e) => {
                // Unknown is treated as new; the insert will surface real store problems
                warn!(path = %path.display(), error = %e, "Store digest lookup failed");
                None
            }
        }
    }

    async fn report_failure(&self, failed: &IngestFailure) {
        error!(
            path = %failed.path.display(),
            stage = %failed.stage,
            error = %failed.message,
            "File failed"
        );

        let entry = LogEntry::new(LogLevel::Error, LOG_TARGET, "File failed")
            .with_field("path", failed.path.display().to_string())
            .with_field("stage", failed.stage.to_string())
            .with_field("error", failed.message.clone());
        self.send_to_sink(entry).await;
    }

    async fn report_skip(&self, skipped: &SkippedFile) {
        let (message, other) = match &skipped.reason {
            SkipReason::DuplicateInRun { first_seen } => {
                ("Duplicate skipped", first_seen.display().to_string())
            }
            SkipReason::KnownToStore { record_id } => ("Already stored", record_id.clone()),
        };

        info!(
            path = %skipped.path.display(),
            digest = %skipped.content_digest,
            duplicate_of = %other,
            "{}",
            message
        );

        let entry = LogEntry::new(LogLevel::Info, LOG_TARGET, message)
            .with_field("path", skipped.path.display().to_string())
            .with_field("digest", skipped.content_digest.to_string())
            .with_field("duplicate_of", other);
        self.send_to_sink(entry).await;
    }

    async fn send_to_sink(&self, entry: LogEntry) {
        if entry.level < self.config.logger_sink.min_level() {
            return;
        }
        if let Err(e) = self.config.logger_sink.log(entry).await {
            warn!(error = %e, "Logger sink rejected entry");
        }
    }
}

async fn ensure_source_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(IngestError::DirectoryNotFound(dir.to_path_buf())),
    }
}
