//! Models command - inspect the OCR model directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use vlozy_core::models::config::VlozyConfig;

use super::common;

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check which model files are present
    Status(StatusArgs),

    /// Print the model directory
    Path(StatusArgs),
}

#[derive(Args)]
struct StatusArgs {
    /// Model directory to inspect instead of the configured one
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = common::load_config(config_path)?;

    match args.command {
        ModelsCommand::Status(status_args) => {
            let model_dir = common::resolve_model_dir(status_args.model_dir.as_deref(), &config);
            check_status(&model_dir, &config)
        }
        ModelsCommand::Path(path_args) => {
            let model_dir = common::resolve_model_dir(path_args.model_dir.as_deref(), &config);
            println!("{}", model_dir.display());
            Ok(())
        }
    }
}

fn check_status(model_dir: &Path, config: &VlozyConfig) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!("Directory: {}", style(model_dir.display()).cyan());
    println!();

    let mut all_present = true;
    let mut total_size: u64 = 0;

    for filename in config.models.file_names() {
        let path = config.model_path(model_dir, filename);
        let (status, size_str) = if path.is_file() {
            let size = fs::metadata(&path)?.len();
            total_size += size;
            if size > 0 {
                (style("✓").green(), format_size(size))
            } else {
                all_present = false;
                (style("⚠").yellow(), "empty".to_string())
            }
        } else {
            all_present = false;
            (style("✗").red(), "missing".to_string())
        };

        println!("    {} {:<25} {:>10}", status, filename, size_str);
    }

    println!();
    if all_present {
        println!(
            "    {} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "    {} Place {} in {} or set models.model_dir",
            style("⚠").yellow(),
            config.models.file_names().join(", "),
            model_dir.display()
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(18_400_000), "18.4MB");
        assert_eq!(format_size(2_000), "2.0KB");
    }
}
