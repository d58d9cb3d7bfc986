//! Configuration structures for the extraction pipeline.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::VlozyError;

/// Main configuration for the vlozy pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VlozyConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Document normalization configuration.
    pub document: DocumentConfig,

    /// Region cropping and enhancement configuration.
    pub region: RegionConfig,

    /// Table export configuration.
    pub export: ExportConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Keep `[UNK]` tokens emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { keep_unk: false }
    }
}

/// Document normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Scale factor applied when rasterizing the first PDF page.
    pub pdf_scale: f32,

    /// Column width used to wrap plain-text documents.
    pub wrap_columns: usize,

    /// Margin around rendered text, in pixels.
    pub margin: u32,

    /// Font size for rendered text, in pixels.
    pub font_size: f32,

    /// Extra spacing between rendered lines, in pixels.
    pub line_spacing: u32,

    /// Candidate font files, tried in order.
    pub font_paths: Vec<PathBuf>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            pdf_scale: 1.0,
            wrap_columns: 100,
            margin: 20,
            font_size: 17.0,
            line_spacing: 5,
            font_paths: vec![
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSansMono.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf"),
                PathBuf::from("/System/Library/Fonts/Menlo.ttc"),
                PathBuf::from("C:\\Windows\\Fonts\\consola.ttf"),
            ],
        }
    }
}

/// Resampling filter used when upscaling cropped regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Region cropping and enhancement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// White border added around each crop, in pixels.
    pub padding: u32,

    /// Integer upscale factor applied before recognition (2 or 3).
    pub upscale: u32,

    /// Resampling filter for the upscale.
    pub filter: ResampleFilter,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding: 10,
            upscale: 2,
            filter: ResampleFilter::CatmullRom,
        }
    }
}

impl RegionConfig {
    /// Check that the configured values are usable.
    pub fn validate(&self) -> Result<(), VlozyError> {
        if !matches!(self.upscale, 2 | 3) {
            return Err(VlozyError::Config(format!(
                "region.upscale must be 2 or 3, got {}",
                self.upscale
            )));
        }
        Ok(())
    }
}

/// Table export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Field delimiter for delimited export.
    pub delimiter: char,

    /// Cell text written for a zone or document that failed.
    pub failure_marker: String,
}

impl ExportConfig {
    /// Check that the delimiter can be written by the CSV exporter.
    pub fn validate(&self) -> Result<(), VlozyError> {
        delimiter_byte(self.delimiter).map(|_| ())
    }
}

/// The delimiter as a CSV byte: ASCII, and neither the quote nor a line break.
pub(crate) fn delimiter_byte(delimiter: char) -> Result<u8, VlozyError> {
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
        return Err(VlozyError::Config(format!(
            "export.delimiter must be a single ASCII character other than a quote or line break, got {:?}",
            delimiter
        )));
    }
    Ok(delimiter as u8)
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            failure_marker: "#ERROR".to_string(),
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files (defaults to the per-user data dir).
    pub model_dir: Option<PathBuf>,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Model file names in loading order.
    pub fn file_names(&self) -> [&str; 3] {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
    }
}

impl VlozyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check every section with constraints beyond its type.
    pub fn validate(&self) -> Result<(), VlozyError> {
        self.region.validate()?;
        self.export.validate()
    }

    /// Get full path to a model file inside `model_dir`.
    pub fn model_path(&self, model_dir: &std::path::Path, model_name: &str) -> PathBuf {
        model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VlozyConfig::default();
        assert_eq!(config.region.upscale, 2);
        assert_eq!(config.region.padding, 10);
        assert_eq!(config.document.wrap_columns, 100);
        assert_eq!(config.export.delimiter, ',');
        assert!(config.region.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: VlozyConfig =
            serde_json::from_str(r#"{"region": {"upscale": 3, "filter": "lanczos3"}}"#).unwrap();
        assert_eq!(config.region.upscale, 3);
        assert_eq!(config.region.filter, ResampleFilter::Lanczos3);
        assert_eq!(config.region.padding, 10);
        assert_eq!(config.export.failure_marker, "#ERROR");
    }

    #[test]
    fn test_upscale_must_be_two_or_three() {
        let mut region = RegionConfig::default();
        region.upscale = 4;
        assert!(region.validate().is_err());
        region.upscale = 3;
        assert!(region.validate().is_ok());
    }

    #[test]
    fn test_delimiter_must_be_ascii() {
        let mut config = VlozyConfig::default();
        config.export.delimiter = ';';
        assert!(config.validate().is_ok());

        config.export.delimiter = '§';
        assert!(matches!(config.validate(), Err(VlozyError::Config(_))));

        config.export.delimiter = '"';
        assert!(config.export.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = VlozyConfig::default();
        config.export.failure_marker = "n/a".to_string();
        config.save(&path).unwrap();

        let loaded = VlozyConfig::from_file(&path).unwrap();
        assert_eq!(loaded.export.failure_marker, "n/a");
    }
}
