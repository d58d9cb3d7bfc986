//! Core library for zone-based document extraction.
//!
//! This crate provides:
//! - Document normalization (PDF, plain text and raster images to one RGB image)
//! - Named zones with validated geometry and a JSON zone configuration store
//! - Region cropping and enhancement ahead of OCR
//! - A shared, lazily initialized recognition engine with text normalization
//! - Batch orchestration producing a CSV/JSON exportable extraction table

pub mod batch;
pub mod document;
pub mod error;
pub mod models;
pub mod ocr;
pub mod zone;

pub use batch::{
    BatchEvent, BatchInput, BatchOrchestrator, BatchRun, CancellationToken, ExportOptions,
    ExtractionRecord, ExtractionTable, FieldValue, RecordStatus,
};
pub use document::{CanonicalImage, DocumentKind, DocumentNormalizer, SourceDocument};
pub use error::{Result, VlozyError};
pub use models::config::VlozyConfig;
pub use ocr::{RecognitionAdapter, RegionExtractor, SharedRecognizer, TextRecognizer};
pub use zone::{DrawnRect, Zone, ZoneSet};

#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
