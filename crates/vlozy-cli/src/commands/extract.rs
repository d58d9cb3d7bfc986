//! Extract command - preview zone extraction on a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use vlozy_core::batch::{BatchOrchestrator, ExportOptions, ExtractionRecord, ExtractionTable, FieldValue};
use vlozy_core::document::SourceDocument;
use vlozy_core::zone::{load_zones_file, DrawnRect};

use super::common::{self, OutputFormat, Pipeline};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (PDF, text or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Zone configuration file
    #[arg(short, long, conflicts_with = "zone", required_unless_present = "zone")]
    zones: Option<PathBuf>,

    /// Inline zone as name=left,top,width,height (repeatable)
    #[arg(long, value_parser = common::parse_named_rect)]
    zone: Vec<(String, DrawnRect)>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = common::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let zones = match &args.zones {
        Some(path) => load_zones_file(path)?,
        None => common::zones_from_named(&args.zone)?,
    };
    common::ensure_not_empty(&zones)?;

    info!("Extracting {} zones from {}", zones.len(), args.input.display());

    let model_dir = common::resolve_model_dir(args.model_dir.as_deref(), &config);
    let pipeline = Pipeline::from_config(&config, model_dir)?;
    let document = SourceDocument::from_path(&args.input)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Extracting {}", document.file_name));

    let record = tokio::task::spawn_blocking(move || {
        let orchestrator =
            BatchOrchestrator::new(&pipeline.normalizer, &pipeline.extractor, &pipeline.recognizer);
        orchestrator.extract_document(&document, &zones)
    })
    .await?;

    pb.finish_and_clear();

    let options = ExportOptions::from_config(&config.export);
    let output = format_record(&record, args.format, &options)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_record(
    record: &ExtractionRecord,
    format: OutputFormat,
    options: &ExportOptions,
) -> anyhow::Result<String> {
    let columns: Vec<String> = record.fields.iter().map(|(name, _)| name.clone()).collect();
    let mut table = ExtractionTable::new(columns);
    table.push(record.clone());

    Ok(match format {
        OutputFormat::Json => table.to_json(false)? + "\n",
        OutputFormat::Csv => table.to_csv(options)?,
        OutputFormat::Text => format_record_text(record),
    })
}

fn format_record_text(record: &ExtractionRecord) -> String {
    let width = record
        .fields
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);

    let mut output = format!("File: {}\n", record.file_name);
    for (name, value) in &record.fields {
        match value {
            FieldValue::Text(text) => output.push_str(&format!("  {:<width$}  {}\n", name, text)),
            FieldValue::Failed { reason } => {
                output.push_str(&format!("  {:<width$}  [failed: {}]\n", name, reason))
            }
        }
    }
    output
}
