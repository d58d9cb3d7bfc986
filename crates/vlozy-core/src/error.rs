//! Error types for the vlozy-core library.

use thiserror::Error;

/// Main error type for the vlozy library.
#[derive(Error, Debug)]
pub enum VlozyError {
    /// Document could not be decoded into a canonical image.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Zone configuration file is malformed.
    #[error("zone configuration error: {0}")]
    ZoneConfig(#[from] ZoneConfigError),

    /// Zone set could not be assembled.
    #[error("zone error: {0}")]
    Zone(#[from] ZoneError),

    /// Zone rectangle is degenerate or misplaced.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning uploaded bytes into a canonical image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Failed to open or render the PDF.
    #[error("failed to render PDF: {0}")]
    Pdf(String),

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Raster bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Image(String),

    /// The file could not be read.
    #[error("failed to read document: {0}")]
    Read(String),

    /// No bytes were supplied.
    #[error("document is empty")]
    Empty,
}

/// Errors related to OCR processing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The shared engine could not be initialized.
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while loading a persisted zone configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneConfigError {
    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(String),

    /// The top-level value is not an array.
    #[error("zone configuration must be a JSON array")]
    NotAnArray,

    /// A record is missing a field or carries an invalid value.
    #[error("record {index}{}: {reason}", name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default())]
    Record {
        index: usize,
        name: Option<String>,
        reason: String,
    },

    /// Two records share a name.
    #[error("record {index}: duplicate zone name '{name}'")]
    DuplicateName { index: usize, name: String },
}

/// Errors raised while building a zone set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// Drawn rectangles and names cannot be paired positionally.
    #[error("{rects} rectangles drawn for {names} zone names")]
    CountMismatch { rects: usize, names: usize },

    /// Zone names must be unique within a set.
    #[error("duplicate zone name '{0}'")]
    DuplicateName(String),

    /// A zone rectangle is invalid.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Degenerate or misplaced zone rectangles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Zone name is blank.
    #[error("zone name must not be empty")]
    EmptyName,

    /// Zone name collides with a column the export adds itself.
    #[error("zone name '{0}' is reserved for an export column")]
    ReservedName(String),

    /// Width or height is zero.
    #[error("zone '{name}' has non-positive size {width}x{height}")]
    ZeroSize {
        name: String,
        width: i64,
        height: i64,
    },

    /// Left or top offset is negative.
    #[error("zone '{name}' has a negative offset")]
    NegativeOffset { name: String },

    /// Zone rectangle does not intersect the image.
    #[error("zone '{name}' lies outside the {image_width}x{image_height} image")]
    OutsideImage {
        name: String,
        image_width: u32,
        image_height: u32,
    },
}

/// Result type for the vlozy library.
pub type Result<T> = std::result::Result<T, VlozyError>;
