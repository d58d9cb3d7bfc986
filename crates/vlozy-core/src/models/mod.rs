//! Data models shared across the pipeline.

pub mod config;

pub use config::{
    DocumentConfig, ExportConfig, ModelConfig, OcrConfig, RegionConfig, ResampleFilter,
    VlozyConfig,
};
