// ==============================================================================
// output.rs - Ancestry Report Output Generation
// ==============================================================================
// Description: Write processing reports as JSON, marker samples as CSV, and
//              render console summaries
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-09-22
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::Marker;
use crate::processor::{ProcessedExport, ProcessingReport};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full report (file metadata, summary, variant results)
    Json,
    /// Materialized marker sample
    Csv,
}

impl OutputFormat {
    /// Suffix appended to the export's sanitized name
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "ancestry.json",
            OutputFormat::Csv => "markers.csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Csv => "text/csv",
        }
    }
}

pub struct OutputGenerator {
    output_dir: PathBuf,
}

impl OutputGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the requested formats for one processed export
    ///
    /// # Returns
    /// * HashMap of format -> file path
    pub fn generate(
        &self,
        formats: &[OutputFormat],
        processed: &ProcessedExport,
    ) -> Result<HashMap<OutputFormat, PathBuf>> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {:?}", self.output_dir)
        })?;

        let mut result = HashMap::new();
        for format in formats {
            let path = self.path_for(&processed.report, *format);
            match format {
                OutputFormat::Json => write_report_json(&processed.report, &path)?,
                OutputFormat::Csv => write_markers_csv(&processed.markers, &path)?,
            }
            result.insert(*format, path);
        }

        Ok(result)
    }

    fn path_for(&self, report: &ProcessingReport, format: OutputFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", report.file.safe_name, format.extension()))
    }
}

/// Write a report as pretty-printed JSON
pub fn write_report_json(report: &ProcessingReport, path: &Path) -> Result<()> {
    info!("Generating JSON output: {:?}", path);

    let file = std::fs::File::create(path).context("Failed to create JSON output file")?;
    serde_json::to_writer_pretty(file, report).context("Failed to write JSON output")?;

    info!(
        "JSON output complete: {} markers, {} calculator results",
        report.summary.parsed_marker_count,
        report.results.len()
    );
    Ok(())
}

/// Write markers as CSV (rsid, chromosome, position, genotype)
pub fn write_markers_csv(markers: &[Marker], path: &Path) -> Result<()> {
    info!("Generating CSV output: {:?}", path);

    let mut writer = csv::Writer::from_path(path).context("Failed to create CSV output file")?;
    for marker in markers {
        writer
            .serialize(marker)
            .with_context(|| format!("Failed to write marker {}", marker.rsid))?;
    }
    writer.flush().context("Failed to flush CSV output")?;

    info!("CSV output complete: {} markers", markers.len());
    Ok(())
}

/// Human-readable console summary of a report
pub fn render_summary(report: &ProcessingReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", report.file.original_name);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Provider:        {}", report.provider);
    let _ = writeln!(out, "Lines scanned:   {}", report.summary.total_lines_scanned);
    let _ = writeln!(out, "Markers parsed:  {}", report.summary.parsed_marker_count);
    let _ = writeln!(out, "Chromosomes:     {}", report.summary.distinct_chromosome_count);

    for variant in &report.results {
        let result = &variant.result;
        let _ = writeln!(out);
        let _ = writeln!(out, "{} [{} v{}]", result.name, variant.variant, variant.panel_version);
        let _ = writeln!(
            out,
            "  Markers used: {}/{}   Confidence: {:.1}",
            result.markers_used, result.total_markers, result.confidence
        );
        if let Some(warning) = &result.warning {
            let _ = writeln!(out, "  Warning: {}", warning);
        }
        for (population, percent) in result.ancestry.ranked() {
            let _ = writeln!(out, "  {:<20} {:>6.1}%", population, percent);
        }
    }

    out
}
