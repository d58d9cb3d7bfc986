//! Document normalization: any supported upload becomes one canonical RGB image.

mod font;
mod pdf;
mod text;

pub use font::TextFont;
pub use pdf::rasterize_first_page;
pub use text::{decode_text, render_text, wrap_lines};

use std::path::Path;

use image::RgbImage;
use tracing::{debug, trace};

use crate::error::DocumentError;
use crate::models::config::DocumentConfig;

/// The single raster representation of one uploaded document.
pub type CanonicalImage = RgbImage;

/// How a document's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF; only the first page is rendered.
    Pdf,
    /// Plain text rendered onto a synthetic page.
    Text,
    /// Any raster format the `image` crate can decode.
    Raster,
}

impl DocumentKind {
    /// Infer the kind from the file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => DocumentKind::Pdf,
            "txt" => DocumentKind::Text,
            _ => DocumentKind::Raster,
        }
    }
}

/// An uploaded document: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a document from disk, naming it after the file.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(display_name(path), bytes))
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_file_name(&self.file_name)
    }
}

/// The name a document is reported under: its file name, else the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Converts uploads into canonical images.
pub struct DocumentNormalizer {
    config: DocumentConfig,
    font: TextFont,
}

impl DocumentNormalizer {
    /// Create a normalizer, resolving the text font once.
    pub fn new(config: DocumentConfig) -> Self {
        let font = TextFont::resolve(&config.font_paths, config.font_size);
        Self { config, font }
    }

    /// Create a normalizer with an explicit font.
    pub fn with_font(config: DocumentConfig, font: TextFont) -> Self {
        Self { config, font }
    }

    pub fn font(&self) -> &TextFont {
        &self.font
    }

    /// Turn `file_bytes` into a canonical image according to `file_name`.
    pub fn normalize(&self, file_name: &str, file_bytes: &[u8]) -> Result<CanonicalImage, DocumentError> {
        if file_bytes.is_empty() {
            return Err(DocumentError::Empty);
        }

        let kind = DocumentKind::from_file_name(file_name);
        trace!("Normalizing {} as {:?} ({} bytes)", file_name, kind, file_bytes.len());

        let image = match kind {
            DocumentKind::Pdf => rasterize_first_page(file_bytes, self.config.pdf_scale)?,
            DocumentKind::Text => {
                let text = decode_text(file_bytes);
                render_text(&text, &self.font, &self.config)
            }
            DocumentKind::Raster => image::load_from_memory(file_bytes)
                .map_err(|e| DocumentError::Image(e.to_string()))?
                .to_rgb8(),
        };

        debug!(
            "Normalized {} to {}x{} canonical image",
            file_name,
            image.width(),
            image.height()
        );

        Ok(image)
    }

    /// Normalize a [`SourceDocument`].
    pub fn normalize_document(&self, document: &SourceDocument) -> Result<CanonicalImage, DocumentError> {
        self.normalize(&document.file_name, &document.bytes)
    }
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}
