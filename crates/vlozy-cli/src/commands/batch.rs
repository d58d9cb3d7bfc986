//! Batch command - apply one zone set to many documents.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use vlozy_core::batch::{
    BatchEvent, BatchInput, BatchOrchestrator, BatchRun, CancellationToken, ExportOptions,
    RecordStatus,
};
use vlozy_core::zone::load_zones_file;

use super::common::{self, OutputFormat, Pipeline};

/// Extensions picked up from a glob pattern.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp",
];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Zone configuration file
    #[arg(short, long, required = true)]
    zones: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Append status and error columns
    #[arg(long)]
    with_status: bool,

    /// Stop after the first document with a failure
    #[arg(long)]
    fail_fast: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = common::load_config(config_path)?;

    if args.format == OutputFormat::Text {
        anyhow::bail!("Batch output supports csv or json");
    }

    // Zone errors are structural: surface them before touching any document.
    let zones = load_zones_file(&args.zones)?;
    common::ensure_not_empty(&zones)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process with {} zones",
        style("ℹ").blue(),
        files.len(),
        zones.len()
    );

    let model_dir = common::resolve_model_dir(args.model_dir.as_deref(), &config);
    let pipeline = Pipeline::from_config(&config, model_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let token = CancellationToken::new();
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current document");
                token.cancel();
            }
        })
    };

    let fail_fast = args.fail_fast;
    let worker_pb = pb.clone();
    let worker_token = token.clone();
    let (run, first_failure) = tokio::task::spawn_blocking(move || {
        let documents = files.into_iter().map(|path| BatchInput::from_path(&path));

        let mut first_failure: Option<String> = None;
        let orchestrator =
            BatchOrchestrator::new(&pipeline.normalizer, &pipeline.extractor, &pipeline.recognizer)
                .with_cancellation(worker_token.clone());

        let run = orchestrator.run(documents, &zones, |event| match event {
            BatchEvent::DocumentStarted { file_name, .. } => {
                worker_pb.set_message(file_name.to_string());
            }
            BatchEvent::ZoneFinished { zone, value, .. } => {
                debug!("{} -> {:?}", zone, value);
            }
            BatchEvent::DocumentFinished { record, .. } => {
                worker_pb.inc(1);
                if fail_fast && record.status != RecordStatus::Complete && first_failure.is_none() {
                    first_failure = Some(format!(
                        "{}: {}",
                        record.file_name,
                        record.error_summary().unwrap_or_default()
                    ));
                    worker_token.cancel();
                }
            }
            BatchEvent::Cancelled { processed } => {
                worker_pb.set_message(format!("cancelled after {}", processed));
            }
        });

        (run, first_failure)
    })
    .await?;

    interrupt.abort();
    pb.finish_with_message(if run.cancelled { "Cancelled" } else { "Complete" });

    write_output(&run, &args, &ExportOptions::from_config(&config.export))?;
    print_summary(&run, start);

    if let Some(failure) = first_failure {
        anyhow::bail!("Stopped on first failure: {}", failure);
    }

    Ok(())
}

fn write_output(run: &BatchRun, args: &BatchArgs, options: &ExportOptions) -> anyhow::Result<()> {
    let options = options.clone().with_status(args.with_status);

    let content = match args.format {
        OutputFormat::Json => run.table.to_json(args.with_status)? + "\n",
        _ => run.table.to_csv(&options)?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!(
                "{} Results written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => print!("{}", content),
    }

    Ok(())
}

fn print_summary(run: &BatchRun, start: Instant) {
    let table = &run.table;

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?} (started {})",
        style("✓").green(),
        table.len(),
        start.elapsed(),
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    eprintln!(
        "   {} complete, {} partial, {} failed",
        style(table.count_status("ok")).green(),
        style(table.count_status("partial")).yellow(),
        style(table.count_status("failed")).red()
    );

    let problems: Vec<_> = table
        .records
        .iter()
        .filter(|r| r.status != RecordStatus::Complete)
        .collect();

    if !problems.is_empty() {
        eprintln!();
        eprintln!("{}", style("Files with failures:").red());
        for record in problems {
            eprintln!(
                "  - {}: {}",
                record.file_name,
                record.error_summary().unwrap_or_default()
            );
        }
    }

    if run.cancelled {
        eprintln!();
        eprintln!("{} Batch was cancelled before all files were processed", style("⚠").yellow());
    }
}
