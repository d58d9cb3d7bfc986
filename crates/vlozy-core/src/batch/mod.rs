//! Batch orchestration: replay one zone set across many documents.
//!
//! Documents are processed sequentially in input order. Decode failures are
//! scoped to a document and recognition or geometry failures to a zone; in
//! both cases the row is kept and the batch moves on.

mod table;

pub use table::{
    ExportOptions, ExtractionRecord, ExtractionTable, FieldValue, RecordStatus, ERROR_COLUMN,
    FILE_NAME_COLUMN, STATUS_COLUMN,
};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::document::{display_name, DocumentNormalizer, SourceDocument};
use crate::error::DocumentError;
use crate::ocr::{RecognitionAdapter, RegionExtractor};
use crate::zone::ZoneSet;

/// Cooperative cancellation flag, checked between documents.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One entry of a batch: a loaded document, or one whose bytes could not be read.
#[derive(Debug, Clone)]
pub enum BatchInput {
    Loaded(SourceDocument),
    Unreadable { file_name: String, reason: String },
}

impl BatchInput {
    /// Read `path`, keeping a read failure as an entry of its own.
    pub fn from_path(path: &Path) -> Self {
        match SourceDocument::from_path(path) {
            Ok(document) => BatchInput::Loaded(document),
            Err(e) => BatchInput::Unreadable {
                file_name: display_name(path),
                reason: DocumentError::Read(e.to_string()).to_string(),
            },
        }
    }
}

impl From<SourceDocument> for BatchInput {
    fn from(document: SourceDocument) -> Self {
        BatchInput::Loaded(document)
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    DocumentStarted {
        index: usize,
        file_name: &'a str,
    },
    ZoneFinished {
        index: usize,
        zone: &'a str,
        value: &'a FieldValue,
    },
    DocumentFinished {
        index: usize,
        record: &'a ExtractionRecord,
    },
    /// The run stopped early after `processed` documents.
    Cancelled { processed: usize },
}

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub table: ExtractionTable,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

/// Drives normalize, crop and recognize for every document and zone.
pub struct BatchOrchestrator<'a> {
    normalizer: &'a DocumentNormalizer,
    extractor: &'a RegionExtractor,
    recognizer: &'a RecognitionAdapter,
    cancellation: Option<CancellationToken>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        normalizer: &'a DocumentNormalizer,
        extractor: &'a RegionExtractor,
        recognizer: &'a RecognitionAdapter,
    ) -> Self {
        Self {
            normalizer,
            extractor,
            recognizer,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Process `documents` in order, producing one row per document.
    ///
    /// Documents are pulled from the iterator one at a time and dropped once
    /// their row is built.
    pub fn run<I, F>(&self, documents: I, zones: &ZoneSet, mut on_event: F) -> BatchRun
    where
        I: IntoIterator,
        I::Item: Into<BatchInput>,
        F: FnMut(BatchEvent<'_>),
    {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut table = ExtractionTable::new(zones.names());
        let mut cancelled = false;

        info!("Starting batch with {} zones", zones.len());

        for (index, input) in documents.into_iter().enumerate() {
            if self.is_cancelled() {
                info!("Batch cancelled after {} documents", index);
                on_event(BatchEvent::Cancelled { processed: index });
                cancelled = true;
                break;
            }

            let input: BatchInput = input.into();
            let record = match input {
                BatchInput::Loaded(document) => self.process(index, &document, zones, &mut on_event),
                BatchInput::Unreadable { file_name, reason } => {
                    warn!("Skipping {}: {}", file_name, reason);
                    on_event(BatchEvent::DocumentStarted {
                        index,
                        file_name: &file_name,
                    });
                    ExtractionRecord::failed(file_name, zones, reason)
                }
            };
            on_event(BatchEvent::DocumentFinished {
                index,
                record: &record,
            });
            table.push(record);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch finished: {} documents ({} ok, {} partial, {} failed) in {}ms",
            table.len(),
            table.count_status("ok"),
            table.count_status("partial"),
            table.count_status("failed"),
            elapsed_ms
        );

        BatchRun {
            table,
            started_at,
            elapsed_ms,
            cancelled,
        }
    }

    /// Extract every zone from a single document.
    pub fn extract_document(&self, document: &SourceDocument, zones: &ZoneSet) -> ExtractionRecord {
        self.process(0, document, zones, &mut |_: BatchEvent<'_>| {})
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn process(
        &self,
        index: usize,
        document: &SourceDocument,
        zones: &ZoneSet,
        on_event: &mut dyn FnMut(BatchEvent<'_>),
    ) -> ExtractionRecord {
        let start = Instant::now();
        info!("Processing document {}: {}", index + 1, document.file_name);
        on_event(BatchEvent::DocumentStarted {
            index,
            file_name: &document.file_name,
        });

        let image = match self.normalizer.normalize_document(document) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to decode {}: {}", document.file_name, e);
                return ExtractionRecord::failed(&document.file_name, zones, e.to_string());
            }
        };

        let mut fields = Vec::with_capacity(zones.len());
        for zone in zones {
            let value = match self.extractor.extract(&image, zone) {
                Ok(region) => match self.recognizer.recognize(region) {
                    Ok(text) => FieldValue::Text(text),
                    Err(e) => {
                        warn!(
                            "Recognition failed for zone '{}' in {}: {}",
                            zone.name(),
                            document.file_name,
                            e
                        );
                        FieldValue::Failed {
                            reason: e.to_string(),
                        }
                    }
                },
                Err(e) => {
                    warn!("Skipping zone '{}' in {}: {}", zone.name(), document.file_name, e);
                    FieldValue::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            debug!("Zone '{}' -> {:?}", zone.name(), value);
            on_event(BatchEvent::ZoneFinished {
                index,
                zone: zone.name(),
                value: &value,
            });
            fields.push((zone.name().to_string(), value));
        }

        let record = ExtractionRecord::from_fields(&document.file_name, fields);
        info!(
            "Finished {} ({}) in {}ms",
            document.file_name,
            record.status.label(),
            start.elapsed().as_millis()
        );
        record
    }
}
