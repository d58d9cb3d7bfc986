//! Helpers shared by the commands: configuration, model lookup and pipeline wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use vlozy_core::document::DocumentNormalizer;
use vlozy_core::models::config::VlozyConfig;
use vlozy_core::ocr::{PureOcrEngine, RecognitionAdapter, RegionExtractor, SharedRecognizer};
use vlozy_core::zone::{DrawnRect, ZoneSet};

/// Output format for extraction results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of records
    Json,
    /// Delimited text with a header row
    Csv,
    /// Plain text, one zone per line
    Text,
}

/// Per-user configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vlozy")
        .join("config.json")
}

/// The `--config` path, or the per-user default.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration from `--config`, else the per-user file if present, else defaults.
///
/// The result is validated so a bad value fails before any document is read.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<VlozyConfig> {
    let config = match explicit {
        Some(path) => VlozyConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading config from {}", path.display());
                VlozyConfig::from_file(&path)?
            } else {
                VlozyConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Per-user model directory.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vlozy")
        .join("models")
}

/// Model directory from the command line, else config, else the per-user default.
pub fn resolve_model_dir(explicit: Option<&Path>, config: &VlozyConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.models.model_dir.clone())
        .unwrap_or_else(default_model_dir)
}

/// Everything a batch needs, built once per process.
pub struct Pipeline {
    pub normalizer: DocumentNormalizer,
    pub extractor: RegionExtractor,
    pub recognizer: RecognitionAdapter,
}

impl Pipeline {
    /// Wire the pipeline; the recognition engine loads on first use.
    pub fn from_config(config: &VlozyConfig, model_dir: PathBuf) -> anyhow::Result<Self> {
        debug!("Using models from {}", model_dir.display());
        let engine: SharedRecognizer =
            PureOcrEngine::shared(model_dir, config.models.clone(), config.ocr.clone());

        Ok(Self {
            normalizer: DocumentNormalizer::new(config.document.clone()),
            extractor: RegionExtractor::new(&config.region)?,
            recognizer: RecognitionAdapter::new(Arc::new(engine)),
        })
    }
}

/// Parse `left,top,width,height` into a drawn rectangle.
pub fn parse_rect(value: &str) -> Result<DrawnRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle '{}': {}", value, e))?;

    match parts.as_slice() {
        [left, top, width, height] => Ok(DrawnRect::new(*left, *top, *width, *height)),
        _ => Err(format!(
            "rectangle '{}' must have four values: left,top,width,height",
            value
        )),
    }
}

/// Parse `name=left,top,width,height`.
pub fn parse_named_rect(value: &str) -> Result<(String, DrawnRect), String> {
    let (name, rect) = value
        .split_once('=')
        .ok_or_else(|| format!("zone '{}' must look like name=left,top,width,height", value))?;
    Ok((name.to_string(), parse_rect(rect)?))
}

/// Pair named rectangles into a zone set.
pub fn zones_from_named(named: &[(String, DrawnRect)]) -> anyhow::Result<ZoneSet> {
    let rects: Vec<DrawnRect> = named.iter().map(|(_, r)| *r).collect();
    let names: Vec<&str> = named.iter().map(|(n, _)| n.as_str()).collect();
    Ok(ZoneSet::from_drawn(&rects, &names)?)
}

/// Reject an empty zone set before any document is touched.
pub fn ensure_not_empty(zones: &ZoneSet) -> anyhow::Result<()> {
    if zones.is_empty() {
        anyhow::bail!("Zone set is empty; define at least one zone");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rect() {
        assert_eq!(
            parse_rect("10, 20,100,30").unwrap(),
            DrawnRect::new(10.0, 20.0, 100.0, 30.0)
        );
        assert!(parse_rect("10,20,100").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_named_rect() {
        let (name, rect) = parse_named_rect("total=5,6,7,8").unwrap();
        assert_eq!(name, "total");
        assert_eq!(rect, DrawnRect::new(5.0, 6.0, 7.0, 8.0));
        assert!(parse_named_rect("5,6,7,8").is_err());
    }

    #[test]
    fn test_load_config_rejects_bad_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"export": {"delimiter": "§"}}"#).unwrap();

        let err = load_config(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("export.delimiter"));
    }

    #[test]
    fn test_explicit_model_dir_wins() {
        let mut config = VlozyConfig::default();
        config.models.model_dir = Some(PathBuf::from("/from/config"));

        assert_eq!(
            resolve_model_dir(Some(Path::new("/from/cli")), &config),
            PathBuf::from("/from/cli")
        );
        assert_eq!(resolve_model_dir(None, &config), PathBuf::from("/from/config"));
    }
}
