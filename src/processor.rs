// ==============================================================================
// processor.rs - Raw Export Processing Pipeline
// ==============================================================================
// Description: Validates, decodes, parses and scores consumer genotype exports
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-09-21
// Version: 3.0.0
// ==============================================================================
// Pipeline (per file):
//   1. Resolve requested calculator variants (unknown ids fail here)
//   2. Validate upload (size, type, magic number, content sniff, SHA-256)
//   3. Stream-parse the export (plain, gzip or zip)
//   4. Estimate ancestry with each selected panel
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculator::Calculator;
use crate::input::with_export_reader;
use crate::models::{AncestryResult, IngestionSummary, Marker, ParsedFile, Provider};
use crate::parsers::RawExportParser;
use crate::reference_panel::ReferencePanel;
use crate::validator::{FileValidator, ValidatedFile};

/// Markers embedded in a report for display
pub const REPORT_SAMPLE_MARKERS: usize = 100;

/// Which calculator variants to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSelection {
    One(String),
    All,
}

impl VariantSelection {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            VariantSelection::All
        } else {
            VariantSelection::One(value.trim().to_string())
        }
    }
}

/// One calculator's output within a report
#[derive(Debug, Clone, Serialize)]
pub struct VariantResult {
    pub variant: String,
    pub panel_version: String,
    pub result: AncestryResult,
}

/// Serializable outcome of processing one export
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    pub report_id: Uuid,
    pub file: ValidatedFile,
    pub provider: Provider,
    pub summary: IngestionSummary,
    pub sample_markers: Vec<Marker>,
    pub results: Vec<VariantResult>,
    pub processed_at: DateTime<Utc>,
}

/// Report plus the full materialized marker sample
#[derive(Debug, Clone)]
pub struct ProcessedExport {
    pub report: ProcessingReport,
    pub markers: Vec<Marker>,
}

pub struct ExportProcessor {
    validator: FileValidator,
    parser: RawExportParser,
    calculator: Arc<Calculator>,
}

impl ExportProcessor {
    pub fn new(validator: FileValidator, parser: RawExportParser, calculator: Arc<Calculator>) -> Self {
        Self {
            validator,
            parser,
            calculator,
        }
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    pub fn calculator(&self) -> &Arc<Calculator> {
        &self.calculator
    }

    /// Process one export file synchronously
    pub fn process_file(&self, path: &Path, selection: &VariantSelection) -> Result<ProcessedExport> {
        info!("Processing raw export: {:?}", path);

        // 1. Resolve variants before touching the file
        let panels = self.select_panels(selection)?;

        // 2. Validate upload
        let validated = self
            .validator
            .validate_upload(path)
            .with_context(|| format!("Validation failed for {:?}", path))?;

        // 3. Parse
        let parsed: ParsedFile = with_export_reader(path, validated.compression, |reader| {
            Ok(self.parser.parse_reader(reader)?)
        })
        .with_context(|| format!("Failed to parse {:?}", path))?;

        if parsed.summary.parsed_marker_count == 0 {
            warn!("No markers found in {:?}. File format may be incorrect.", path);
        }

        // 4. Estimate
        let results: Vec<VariantResult> = panels
            .iter()
            .map(|panel| {
                let result = self.calculator.estimator().estimate(panel, &parsed.markers);
                info!(
                    "{}: {} of {} markers used, confidence {:.1}",
                    result.name, result.markers_used, result.total_markers, result.confidence
                );
                VariantResult {
                    variant: panel.id().to_string(),
                    panel_version: panel.version().to_string(),
                    result,
                }
            })
            .collect();

        let report = ProcessingReport {
            report_id: Uuid::new_v4(),
            file: validated,
            provider: parsed.provider,
            summary: parsed.summary.clone(),
            sample_markers: parsed
                .markers
                .iter()
                .take(REPORT_SAMPLE_MARKERS)
                .cloned()
                .collect(),
            results,
            processed_at: Utc::now(),
        };

        Ok(ProcessedExport {
            report,
            markers: parsed.markers,
        })
    }

    fn select_panels(&self, selection: &VariantSelection) -> Result<Vec<Arc<ReferencePanel>>> {
        match selection {
            VariantSelection::All => Ok(self.calculator.panels().cloned().collect()),
            VariantSelection::One(id) => Ok(vec![Arc::clone(self.calculator.panel(id)?)]),
        }
    }

    /// Process several exports concurrently on the blocking thread pool
    ///
    /// Results come back in input order; one failing file does not stop
    /// the others.
    pub async fn process_files(
        self: Arc<Self>,
        paths: Vec<PathBuf>,
        selection: VariantSelection,
    ) -> Vec<(PathBuf, Result<ProcessedExport>)> {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let processor = Arc::clone(&self);
                let selection = selection.clone();
                let task_path = path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    processor.process_file(&task_path, &selection)
                });
                (path, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("Processing task failed: {}", e)),
            };
            outcomes.push((path, outcome));
        }

        outcomes
    }
}
