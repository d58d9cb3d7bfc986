//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{SharedRecognizer, TextRecognizer};

/// Height of one reading-order row, in pixels.
const ROW_HEIGHT: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig, config: OcrConfig) -> Result<Self, OcrError> {
        let missing: Vec<&str> = models
            .file_names()
            .into_iter()
            .filter(|name| !model_dir.join(name).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(OcrError::ModelLoad(format!(
                "missing {} in {}",
                missing.join(", "),
                model_dir.display()
            )));
        }

        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine, config })
    }

    /// A shared recognizer that loads this engine on first use.
    pub fn shared(model_dir: PathBuf, models: ModelConfig, config: OcrConfig) -> SharedRecognizer {
        SharedRecognizer::lazy(move || {
            let engine = PureOcrEngine::from_dir(&model_dir, &models, config)?;
            Ok(Box::new(engine) as Box<dyn TextRecognizer>)
        })
    }
}

impl TextRecognizer for PureOcrEngine {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<Vec<String>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut fragments: Vec<(f64, f64, String)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                (x, y, text)
            })
            .collect();

        // Reading order: coarse rows top to bottom, then left to right.
        fragments.sort_by(|a, b| {
            let row_a = (a.1 / ROW_HEIGHT) as i64;
            let row_b = (b.1 / ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        });

        debug!(
            "Recognized {} fragments in {}x{} region in {}ms",
            fragments.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(fragments.into_iter().map(|(_, _, text)| text).collect())
    }
}

/// Smallest x and y over the first four polygon vertices.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f64::MAX, f64::MAX), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
