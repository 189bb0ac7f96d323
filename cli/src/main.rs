//! transkel CLI - extract/transform/merge pipelines for translatable documents

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use transkel::pipeline::{ItemOutcome, StepConfig};
use transkel::{
    BatchItem, BatchReport, DocumentData, Event, FilterRegistry, LocaleId, OutputTarget,
    PipelineConfig, PipelineDriver, RawDocument, StepRegistry,
};

#[derive(Parser)]
#[command(name = "transkel")]
#[command(version)]
#[command(about = "Extract, transform and rebuild translatable documents", long_about = None)]
struct Cli {
    /// Input files, rebuilt unchanged into the output directory
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over a batch of files
    Run {
        /// Input files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Pipeline configuration (JSON); defaults to a plain round trip
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Pseudo-translate the content instead of using a configuration
        #[arg(long, conflicts_with = "config")]
        pseudo: bool,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "out")]
        output: PathBuf,

        /// Filter configuration (detected from the file extension by default)
        #[arg(short, long)]
        filter: Option<String>,

        /// Source locale
        #[arg(short, long, default_value = "en", env = "TRANSKEL_SOURCE_LOCALE")]
        source: String,

        /// Target locale
        #[arg(short, long, env = "TRANSKEL_TARGET_LOCALE")]
        target: Option<String>,

        /// Encoding of the inputs
        #[arg(long, default_value = "UTF-8")]
        encoding: String,

        /// Encoding of the outputs (defaults to the input encoding)
        #[arg(long)]
        output_encoding: Option<String>,

        /// Write the batch report as JSON to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Print the events a filter produces for a file, as JSON
    Events {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Filter configuration (detected from the file extension by default)
        #[arg(short, long)]
        filter: Option<String>,

        /// Source locale
        #[arg(short, long, default_value = "en")]
        source: String,

        /// Encoding of the input
        #[arg(long, default_value = "UTF-8")]
        encoding: String,

        /// Output compact JSON, one event per line
        #[arg(long)]
        compact: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the available pipeline steps
    Steps,

    /// List the available filter configurations
    Formats,

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            inputs,
            config,
            pseudo,
            output,
            filter,
            source,
            target,
            encoding,
            output_encoding,
            report,
        }) => {
            let options = RunOptions {
                filter,
                source,
                target,
                encoding,
                output_encoding,
            };
            load_config(config.as_deref(), pseudo)
                .and_then(|config| cmd_run(&config, &inputs, &output, &options, report.as_deref()))
        }
        Some(Commands::Events {
            input,
            filter,
            source,
            encoding,
            compact,
            output,
        }) => cmd_events(
            &input,
            filter.as_deref(),
            &source,
            &encoding,
            compact,
            output.as_deref(),
        ),
        Some(Commands::Steps) => {
            cmd_steps();
            Ok(())
        }
        Some(Commands::Formats) => {
            cmd_formats();
            Ok(())
        }
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: round-trip the given files
            if cli.inputs.is_empty() {
                println!("{}", "Usage: transkel <FILE>... [-o DIR]".yellow());
                println!("       transkel --help for more information");
                Ok(())
            } else {
                let output = cli.output.unwrap_or_else(|| PathBuf::from("out"));
                cmd_run(
                    &PipelineConfig::round_trip(),
                    &cli.inputs,
                    &output,
                    &RunOptions::default(),
                    None,
                )
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

struct RunOptions {
    filter: Option<String>,
    source: String,
    target: Option<String>,
    encoding: String,
    output_encoding: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter: None,
            source: "en".to_string(),
            target: None,
            encoding: "UTF-8".to_string(),
            output_encoding: None,
        }
    }
}

fn load_config(
    path: Option<&Path>,
    pseudo: bool,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(PipelineConfig::from_file(path)?);
    }
    if pseudo {
        return Ok(PipelineConfig::new("pseudo-translation")
            .with_step(StepConfig::new("filter-events"))
            .with_step(StepConfig::new("pseudo-translate"))
            .with_step(StepConfig::new("events-writer")));
    }
    Ok(PipelineConfig::round_trip())
}

/// Pick the filter configuration for a file.
fn filter_for(
    filters: &FilterRegistry,
    input: &Path,
    requested: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(id) = requested {
        return Ok(id.to_string());
    }
    filters
        .get_for_path(input)
        .map(|c| c.id.clone())
        .ok_or_else(|| {
            format!(
                "no filter for {} (use --filter, see `transkel formats`)",
                input.display()
            )
            .into()
        })
}

fn cmd_run(
    config: &PipelineConfig,
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &RunOptions,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filters = Arc::new(FilterRegistry::with_defaults());
    let source = LocaleId::new(&options.source)?;
    let target = options.target.as_deref().map(LocaleId::new).transpose()?;

    let pipeline = StepRegistry::with_defaults().build_pipeline(config)?;
    let mut driver = PipelineDriver::new(pipeline, filters.clone());

    fs::create_dir_all(output_dir)?;
    for input in inputs {
        let filter_id = filter_for(&filters, input, options.filter.as_deref())?;
        let mut raw = RawDocument::from_path(input, source.clone(), filter_id)
            .with_encoding(options.encoding.clone());
        if let Some(target) = &target {
            raw = raw.with_target_locale(target.clone());
        }

        let name = input.file_name().ok_or("input is not a file")?;
        let mut doc = DocumentData::new(raw).with_output(OutputTarget::Path(output_dir.join(name)));
        if let Some(encoding) = &options.output_encoding {
            doc = doc.with_output_encoding(encoding.clone());
        }
        driver.add_item(BatchItem::new(doc));
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(config.id.clone());
    let progress = pb.clone();
    driver
        .pipeline_mut()
        .add_observer(Box::new(move |event: &Event| {
            if matches!(event, Event::EndBatchItem) {
                progress.inc(1);
            }
        }));

    let report = driver.process_batch()?;
    pb.finish_with_message("Done!");

    print_report(&report);

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }

    if report.failed_count() > 0 {
        return Err(format!("{} item(s) failed", report.failed_count()).into());
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("\n{}", "Batch Report".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for item in &report.items {
        let status = match &item.outcome {
            ItemOutcome::Succeeded => "ok".green(),
            ItemOutcome::Failed { .. } => "failed".red(),
            ItemOutcome::Cancelled => "cancelled".yellow(),
        };
        println!("  {} {}", status, item.name);
        if let ItemOutcome::Failed { kind, message } = &item.outcome {
            println!("    {} {}: {}", "└─".dimmed(), kind, message);
        }
        for diagnostic in &item.diagnostics {
            println!("    {} {}", "·".dimmed(), diagnostic);
        }
    }

    println!();
    println!(
        "{}: {} ({} succeeded, {} failed, {} cancelled in {} ms)",
        "Status".bold(),
        report.status,
        report.succeeded_count(),
        report.failed_count(),
        report.cancelled_count(),
        report.duration_ms()
    );
}

fn cmd_events(
    input: &Path,
    filter: Option<&str>,
    source: &str,
    encoding: &str,
    compact: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filters = FilterRegistry::with_defaults();
    let filter_id = filter_for(&filters, input, filter)?;
    let raw = RawDocument::from_path(input, LocaleId::new(source)?, filter_id).with_encoding(encoding);

    let events = transkel::extract(&raw)?;
    let json = if compact {
        let lines: Result<Vec<String>, _> = events.iter().map(serde_json::to_string).collect();
        lines?.join("\n")
    } else {
        serde_json::to_string_pretty(&events)?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_steps() {
    println!("{}", "Pipeline Steps".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for entry in StepRegistry::with_defaults().entries() {
        println!("  {:<20} {}", entry.id.bold(), entry.description);
    }
}

fn cmd_formats() {
    println!("{}", "Filter Configurations".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for config in FilterRegistry::with_defaults().configurations() {
        let extensions = if config.extensions.is_empty() {
            String::new()
        } else {
            format!(" (.{})", config.extensions.join(", ."))
        };
        println!(
            "  {:<20} {}{}",
            config.id.bold(),
            config.description,
            extensions.dimmed()
        );
    }
}

fn cmd_version() {
    println!("{} {}", "transkel".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Extract/transform/merge pipeline for translatable documents");
    println!();
    println!("License: MIT");
}
