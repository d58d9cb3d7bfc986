//! Zones command - define, validate and inspect zone configurations.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use tracing::info;

use vlozy_core::batch::{BatchOrchestrator, FieldValue};
use vlozy_core::document::{DocumentNormalizer, SourceDocument};
use vlozy_core::zone::{load_zones_file, save_zones_file, DrawnRect, ZoneSet};

use super::common::{self, Pipeline};

/// Arguments for the zones command.
#[derive(Args)]
pub struct ZonesArgs {
    #[command(subcommand)]
    command: ZonesCommand,
}

#[derive(Subcommand)]
enum ZonesCommand {
    /// Define zones on a reference document and save them
    Define(DefineArgs),

    /// Validate a zone configuration file and print its zones
    Show {
        /// Zone configuration file
        path: PathBuf,
    },
}

#[derive(Args)]
struct DefineArgs {
    /// Reference document the rectangles were drawn on
    #[arg(short, long)]
    reference: PathBuf,

    /// Zone name; the i-th name is paired with the i-th rectangle
    #[arg(short, long = "name", required = true)]
    names: Vec<String>,

    /// Rectangle as left,top,width,height
    #[arg(long = "rect", required = true, value_parser = common::parse_rect, allow_hyphen_values = true)]
    rects: Vec<DrawnRect>,

    /// Output zone configuration file
    #[arg(short, long, default_value = "extraction_zones.json")]
    output: PathBuf,

    /// Run extraction on the reference document after saving
    #[arg(long)]
    preview: bool,

    /// Model directory (used with --preview)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: ZonesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ZonesCommand::Define(define_args) => define_zones(define_args, config_path).await,
        ZonesCommand::Show { path } => show_zones(&path),
    }
}

async fn define_zones(args: DefineArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = common::load_config(config_path)?;

    let zones = ZoneSet::from_drawn(&args.rects, &args.names)?;

    let document = SourceDocument::from_path(&args.reference)?;
    let normalizer = DocumentNormalizer::new(config.document.clone());
    let image = normalizer.normalize_document(&document)?;
    zones.check_bounds(image.width(), image.height())?;
    drop(image);

    save_zones_file(&zones, &args.output)?;
    info!("Saved {} zones to {}", zones.len(), args.output.display());

    print_zones(&zones);
    println!();
    println!(
        "{} Saved {} zones to {}",
        style("✓").green(),
        zones.len(),
        args.output.display()
    );

    if args.preview {
        let model_dir = common::resolve_model_dir(args.model_dir.as_deref(), &config);
        let pipeline = Pipeline::from_config(&config, model_dir)?;

        let record = tokio::task::spawn_blocking(move || {
            BatchOrchestrator::new(&pipeline.normalizer, &pipeline.extractor, &pipeline.recognizer)
                .extract_document(&document, &zones)
        })
        .await?;

        println!();
        println!("{}", style("Preview").bold());
        for (name, value) in &record.fields {
            match value {
                FieldValue::Text(text) => println!("  {}: {}", style(name).cyan(), text),
                FieldValue::Failed { reason } => {
                    println!("  {}: {} {}", style(name).cyan(), style("✗").red(), reason)
                }
            }
        }
    }

    Ok(())
}

fn show_zones(path: &Path) -> anyhow::Result<()> {
    let zones = load_zones_file(path)?;

    println!("{}", style(format!("Zones in {}", path.display())).bold());
    println!();
    print_zones(&zones);

    Ok(())
}

fn print_zones(zones: &ZoneSet) {
    let width = zones.iter().map(|z| z.name().len()).max().unwrap_or(4).max(4);

    println!(
        "  {:<width$}  {:>6}  {:>6}  {:>6}  {:>6}",
        "name", "left", "top", "width", "height"
    );
    for zone in zones {
        println!(
            "  {:<width$}  {:>6}  {:>6}  {:>6}  {:>6}",
            style(zone.name()).cyan(),
            zone.left(),
            zone.top(),
            zone.width(),
            zone.height()
        );
    }
}
