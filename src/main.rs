// ==============================================================================
// main.rs - Ancestry Processor Entry Point
// ==============================================================================
// Description: Command line entry point for raw export ancestry estimation
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-09-22
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use ancestry_processor::calculator::{Calculator, DEFAULT_VARIANT};
use ancestry_processor::estimator::{
    EstimatorConfig, DEFAULT_CONFIDENCE_CALIBRATION, DEFAULT_MIN_MARKERS,
};
use ancestry_processor::output::{render_summary, OutputFormat, OutputGenerator};
use ancestry_processor::parsers::{raw_export::DEFAULT_SAMPLE_LIMIT, RawExportParser};
use ancestry_processor::processor::{ExportProcessor, VariantSelection};
use ancestry_processor::reference_panel::ReferencePanel;
use ancestry_processor::validator::FileValidator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw export files or directories containing them
    #[arg(required_unless_present = "list_variants")]
    inputs: Vec<PathBuf>,

    /// Calculator variant to run, or "all"
    #[arg(short, long, env = "ANCESTRY_VARIANT", default_value = DEFAULT_VARIANT)]
    variant: String,

    /// Additional reference panel JSON files
    #[arg(long = "panel-file")]
    panel_files: Vec<PathBuf>,

    /// Minimum panel markers required before scoring
    #[arg(long, env = "ANCESTRY_MIN_MARKERS", default_value_t = DEFAULT_MIN_MARKERS)]
    min_markers: usize,

    /// Markers needed for full confidence weight
    #[arg(
        long,
        env = "ANCESTRY_CONFIDENCE_CALIBRATION",
        default_value_t = DEFAULT_CONFIDENCE_CALIBRATION
    )]
    confidence_calibration: f64,

    /// Markers materialized per export
    #[arg(long, env = "ANCESTRY_SAMPLE_LIMIT", default_value_t = DEFAULT_SAMPLE_LIMIT)]
    sample_limit: usize,

    /// Maximum accepted file size in megabytes
    #[arg(long, default_value_t = 100)]
    max_file_size_mb: u64,

    /// Write JSON reports (and marker CSVs) here
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the marker sample as CSV (requires --output-dir)
    #[arg(long, requires = "output_dir")]
    markers_csv: bool,

    /// List registered calculator variants and exit
    #[arg(long)]
    list_variants: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ancestry_processor=info".into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Ancestry Processor starting...");

    // Build calculator
    let config = EstimatorConfig {
        min_markers: args.min_markers,
        confidence_calibration: args.confidence_calibration,
        ..EstimatorConfig::default()
    };
    let mut calculator = Calculator::with_builtin_panels(config)?;
    for path in &args.panel_files {
        let panel = ReferencePanel::from_path(path)
            .with_context(|| format!("Failed to load panel {:?}", path))?;
        info!("Loaded panel '{}' from {:?}", panel.id(), path);
        calculator.register(panel);
    }

    if args.list_variants {
        for panel in calculator.panels() {
            println!(
                "{:<20} {:<32} {:>3} markers  {} populations",
                panel.id(),
                panel.name(),
                panel.marker_count(),
                panel.populations().len()
            );
        }
        return Ok(());
    }

    let selection = VariantSelection::parse(&args.variant);
    if let VariantSelection::One(id) = &selection {
        // Fail before touching any input
        calculator.panel(id)?;
    }

    // Collect inputs
    let validator = FileValidator::new().with_max_file_size(args.max_file_size_mb * 1024 * 1024);
    let mut files = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {:?}", input))?;
                if entry.file_type().is_file() && validator.is_supported(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(input.clone());
        }
    }

    if files.is_empty() {
        anyhow::bail!("No raw export files found");
    }
    info!("Processing {} file(s) with variant '{}'", files.len(), args.variant);

    let parser = RawExportParser::new().with_sample_limit(args.sample_limit);
    let processor = Arc::new(ExportProcessor::new(validator, parser, Arc::new(calculator)));

    let mut formats = vec![OutputFormat::Json];
    if args.markers_csv {
        formats.push(OutputFormat::Csv);
    }
    let generator = args.output_dir.clone().map(OutputGenerator::new);

    let outcomes = processor.process_files(files, selection).await;
    let mut failures = 0;

    for (path, outcome) in outcomes {
        match outcome {
            Ok(processed) => {
                print!("{}", render_summary(&processed.report));

                if let Some(generator) = &generator {
                    let written = generator.generate(&formats, &processed)?;
                    for (format, output_path) in written {
                        info!("Wrote {:?} output: {:?}", format, output_path);
                    }
                }
            }
            Err(e) => {
                warn!("Processing failed for {:?}: {:#}", path, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        error!("{} file(s) failed", failures);
        anyhow::bail!("{} of the input files could not be processed", failures);
    }

    info!("Processing completed successfully");
    Ok(())
}
